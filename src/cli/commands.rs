//! CLI command implementations
//!
//! Both commands boot the same service: models from the config file, an
//! in-memory store seeded from its fixtures, and an in-process
//! subscription registry.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blueprint::{BlueprintConfig, FindResponse, ModelDef, ModelRegistry, RecordFinder, RequestContext, Transport};
use crate::http_server::{BlueprintState, HttpServer, HttpServerConfig};
use crate::observability::{log_event_with_fields, Event, Logger, MetricsRegistry, Severity};
use crate::realtime::SubscriptionRegistry;
use crate::store::MemoryStore;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_json;

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listener and CORS settings
    #[serde(default)]
    pub http: HttpServerConfig,

    /// Find action settings
    #[serde(default)]
    pub blueprints: BlueprintConfig,

    /// Model declarations
    #[serde(default)]
    pub models: Vec<ModelDef>,

    /// Initial records by model identity
    #[serde(default)]
    pub fixtures: HashMap<String, Vec<Value>>,

    /// Minimum log severity (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> CliResult<()> {
        self.http.validate().map_err(CliError::config_error)?;
        self.blueprints.validate().map_err(CliError::config_error)?;
        self.severity()?;

        let mut identities = HashSet::new();
        for model in &self.models {
            if model.identity.is_empty() {
                return Err(CliError::config_error("Model identity must not be empty"));
            }
            if !identities.insert(model.identity.as_str()) {
                return Err(CliError::config_error(format!(
                    "Duplicate model: {}",
                    model.identity
                )));
            }
        }

        for model in &self.models {
            for association in &model.associations {
                if !identities.contains(association.target.as_str()) {
                    return Err(CliError::config_error(format!(
                        "Association '{}.{}' targets unknown model '{}'",
                        model.identity, association.name, association.target
                    )));
                }
            }
        }

        for identity in self.fixtures.keys() {
            if !identities.contains(identity.as_str()) {
                return Err(CliError::config_error(format!(
                    "Fixtures given for unknown model '{}'",
                    identity
                )));
            }
        }

        Ok(())
    }

    pub fn severity(&self) -> CliResult<Severity> {
        self.log_level.parse().map_err(CliError::config_error)
    }
}

/// Run the CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(&config, port),
        Command::Find { config, url } => find(&config, &url),
    }
}

/// Load the config file and build the shared service state
pub fn boot(config_path: &Path) -> CliResult<(Config, Arc<BlueprintState>)> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.severity()?);

    let path = config_path.display().to_string();
    let models = config.models.len().to_string();
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("path", path.as_str()), ("models", models.as_str())],
    );

    let state = build_state(&config)?;
    Ok((config, state))
}

/// Wire models, store, subscriptions and the find action together
pub fn build_state(config: &Config) -> CliResult<Arc<BlueprintState>> {
    let models = Arc::new(ModelRegistry::from_models(config.models.iter().cloned()));

    let store = Arc::new(MemoryStore::new(models.clone()));
    let seeded = store
        .seed(config.fixtures.clone())
        .map_err(|e| CliError::fixture_error(e.to_string()))?;
    let seeded = seeded.to_string();
    log_event_with_fields(Event::FixturesLoaded, &[("records", seeded.as_str())]);

    let subscriptions = Arc::new(SubscriptionRegistry::with_limit(
        models.clone(),
        config.blueprints.max_subscriptions_per_connection,
    ));

    let finder = RecordFinder::new(models, store, config.blueprints.clone())
        .with_subscriptions(subscriptions.clone())
        .with_metrics(Arc::new(MetricsRegistry::new()));

    Ok(Arc::new(BlueprintState::new(Arc::new(finder), subscriptions)))
}

/// Serve the find action until the process is stopped
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let (config, state) = boot(config_path)?;

    let mut http_config = config.http;
    if let Some(port) = port {
        http_config.port = port;
    }
    let server = HttpServer::with_config(http_config, state);

    // Start the async runtime and run the server
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })?;

    Ok(())
}

/// Run one find and print the response as JSON
pub fn find(config_path: &Path, url: &str) -> CliResult<()> {
    // Stdout carries only the response
    Logger::reserve_stdout();
    let (_config, state) = boot(config_path)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    let response = rt.block_on(execute(&state, url));
    write_json(&response)
}

/// Answer `url` as an HTTP find would
pub async fn execute(state: &BlueprintState, url: &str) -> FindResponse {
    match RequestContext::from_url(url, Transport::Http) {
        Ok(ctx) => FindResponse::from(state.finder.find(&ctx).await),
        Err(e) => FindResponse::error(&e),
    }
}
