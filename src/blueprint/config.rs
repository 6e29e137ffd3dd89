//! Blueprint settings for the find action

use serde::{Deserialize, Serialize};

use super::plan::{DEFAULT_LIMIT, MAX_LIMIT};

/// Settings that shape query parsing and the subscription side effect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintConfig {
    /// Page size when the request has no `limit` (default: 30)
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Largest accepted `limit` (default: 1000)
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Expand every association when the request has no `populate`
    #[serde(default = "default_true")]
    pub populate_by_default: bool,

    /// Subscribe socket requests to returned records
    #[serde(default = "default_true")]
    pub pubsub: bool,

    /// Also watch the model's creation stream on socket finds
    #[serde(default = "default_true")]
    pub auto_watch: bool,

    /// Cap on rooms a single connection may join
    #[serde(default = "default_max_subscriptions")]
    pub max_subscriptions_per_connection: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_max_limit() -> usize {
    MAX_LIMIT
}

fn default_true() -> bool {
    true
}

fn default_max_subscriptions() -> usize {
    100
}

impl Default for BlueprintConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            populate_by_default: true,
            pubsub: true,
            auto_watch: true,
            max_subscriptions_per_connection: default_max_subscriptions(),
        }
    }
}

impl BlueprintConfig {
    /// Check internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.max_limit == 0 {
            return Err("max_limit must be > 0".to_string());
        }
        if self.default_limit > self.max_limit {
            return Err(format!(
                "default_limit {} exceeds max_limit {}",
                self.default_limit, self.max_limit
            ));
        }
        if self.max_subscriptions_per_connection == 0 {
            return Err("max_subscriptions_per_connection must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BlueprintConfig::default();
        assert_eq!(config.default_limit, 30);
        assert_eq!(config.max_limit, 1000);
        assert!(config.pubsub);
        assert!(config.auto_watch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BlueprintConfig = serde_json::from_str(r#"{"auto_watch": false}"#).unwrap();
        assert!(!config.auto_watch);
        assert_eq!(config.default_limit, 30);
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let config = BlueprintConfig {
            default_limit: 50,
            max_limit: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
