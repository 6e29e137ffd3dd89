//! # Model Definitions and Registry
//!
//! Declares the models the find action can serve: their attributes,
//! primary key and associations.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{FindError, FindResult};

/// Attribute types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Number,
    Boolean,
    Json,
}

/// Attribute definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name
    pub name: String,

    #[serde(rename = "type", default = "default_attribute_type")]
    pub attribute_type: AttributeType,
}

fn default_attribute_type() -> AttributeType {
    AttributeType::Json
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

/// How an association relates two models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AssociationKind {
    /// To-one: the attribute stores the related record's primary key
    Model,
    /// To-many: related records whose `via` attribute holds this record's key
    Collection { via: String },
}

/// Association definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationDef {
    /// Attribute name carrying the association
    pub name: String,

    /// Identity of the related model
    pub target: String,

    #[serde(flatten)]
    pub kind: AssociationKind,
}

impl AssociationDef {
    /// To-one association
    pub fn model(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: AssociationKind::Model,
        }
    }

    /// To-many association
    pub fn collection(
        name: impl Into<String>,
        target: impl Into<String>,
        via: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: AssociationKind::Collection { via: via.into() },
        }
    }

    /// Primary keys of related records reachable from `record`.
    ///
    /// Works on both raw foreign keys and populated records.
    pub fn related_keys(&self, record: &Value, target_primary_key: &str) -> Vec<Value> {
        let key_of = |v: &Value| match v {
            Value::Object(obj) => obj.get(target_primary_key).cloned(),
            Value::Null => None,
            other => Some(other.clone()),
        };

        match record.get(&self.name) {
            Some(Value::Array(items)) => items.iter().filter_map(key_of).collect(),
            Some(value) => key_of(value).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

/// Model definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDef {
    /// Model identity, as it appears in the URL
    pub identity: String,

    /// Primary key attribute
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Declared attributes
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,

    /// Declared associations
    #[serde(default)]
    pub associations: Vec<AssociationDef>,

    /// Whether socket requests subscribe to this model's records
    #[serde(default = "default_pubsub")]
    pub pubsub: bool,
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_pubsub() -> bool {
    true
}

impl ModelDef {
    /// Create a model with an `id` primary key and no other attributes
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            primary_key: default_primary_key(),
            attributes: Vec::new(),
            associations: Vec::new(),
            pubsub: default_pubsub(),
        }
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute_type: AttributeType) -> Self {
        self.attributes.push(AttributeDef::new(name, attribute_type));
        self
    }

    pub fn with_association(mut self, association: AssociationDef) -> Self {
        self.associations.push(association);
        self
    }

    pub fn with_pubsub(mut self, pubsub: bool) -> Self {
        self.pubsub = pubsub;
        self
    }

    /// Whether `field` may be sorted or selected on.
    ///
    /// To-one associations are queryable by the stored key; to-many are not.
    pub fn has_attribute(&self, field: &str) -> bool {
        field == self.primary_key
            || self.attributes.iter().any(|a| a.name == field)
            || self
                .associations
                .iter()
                .any(|a| a.name == field && a.kind == AssociationKind::Model)
    }

    /// Get an association by name
    pub fn association(&self, name: &str) -> Option<&AssociationDef> {
        self.associations.iter().find(|a| a.name == name)
    }

    /// Fail with `UnknownAttribute` unless `field` is queryable
    pub fn require_attribute(&self, field: &str) -> FindResult<()> {
        if self.has_attribute(field) {
            Ok(())
        } else {
            Err(FindError::UnknownAttribute {
                model: self.identity.clone(),
                attribute: field.to_string(),
            })
        }
    }

    /// Primary key value of a record
    pub fn primary_key_of<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        record.get(&self.primary_key).filter(|v| !v.is_null())
    }
}

/// Registry of served models
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<String, ModelDef>>,
}

impl ModelRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from model definitions
    pub fn from_models(models: impl IntoIterator<Item = ModelDef>) -> Self {
        let registry = Self::new();
        for model in models {
            registry.register(model);
        }
        registry
    }

    /// Register (or replace) a model
    pub fn register(&self, model: ModelDef) {
        let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());
        models.insert(model.identity.clone(), model);
    }

    /// Get a model by identity
    pub fn get(&self, identity: &str) -> Option<ModelDef> {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(identity)
            .cloned()
    }

    /// Resolve a model or fail with `UnknownModel`
    pub fn resolve(&self, identity: &str) -> FindResult<ModelDef> {
        self.get(identity)
            .ok_or_else(|| FindError::UnknownModel(identity.to_string()))
    }
}
