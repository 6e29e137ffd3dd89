//! # Subscription Management
//!
//! Room-based registry of socket connections interested in record changes.
//!
//! A room is either a single record (`user#7`) or a model's creation
//! stream (`user:create`). Memberships are indexed both by room and by
//! connection so that a closing socket can leave everything at once.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::errors::{RealtimeError, RealtimeResult};
use super::SubscriptionHook;
use crate::blueprint::model::{ModelDef, ModelRegistry};

/// Default cap on rooms per connection
pub const DEFAULT_MAX_PER_CONNECTION: usize = 100;

/// A notification room
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    /// Changes to one record
    Record { model: String, key: String },
    /// Records created in a model
    Creation { model: String },
}

impl Room {
    /// Room for the record with primary key `key`
    pub fn record(model: impl Into<String>, key: &Value) -> Self {
        let key = match key {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Room::Record {
            model: model.into(),
            key,
        }
    }

    pub fn creation(model: impl Into<String>) -> Self {
        Room::Creation {
            model: model.into(),
        }
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Record { model, key } => write!(f, "{}#{}", model, key),
            Room::Creation { model } => write!(f, "{}:create", model),
        }
    }
}

/// Registry of room memberships
#[derive(Debug)]
pub struct SubscriptionRegistry {
    /// Model definitions, for resolving association targets
    models: Arc<ModelRegistry>,

    /// Connection IDs by room
    by_room: RwLock<HashMap<Room, HashSet<String>>>,

    /// Rooms by connection
    by_connection: RwLock<HashMap<String, HashSet<Room>>>,

    /// Maximum rooms per connection
    max_per_connection: usize,
}

impl SubscriptionRegistry {
    /// Create a new registry
    pub fn new(models: Arc<ModelRegistry>) -> Self {
        Self::with_limit(models, DEFAULT_MAX_PER_CONNECTION)
    }

    pub fn with_limit(models: Arc<ModelRegistry>, max_per_connection: usize) -> Self {
        Self {
            models,
            by_room: RwLock::new(HashMap::new()),
            by_connection: RwLock::new(HashMap::new()),
            max_per_connection,
        }
    }

    /// Add a connection to a room. Returns false if it was already there.
    pub fn join(&self, connection_id: &str, room: Room) -> RealtimeResult<bool> {
        // Lock order: by_connection, then by_room
        let mut by_conn = self
            .by_connection
            .write()
            .map_err(|_| RealtimeError::Internal("Lock poisoned".into()))?;
        let rooms = by_conn.entry(connection_id.to_string()).or_default();

        if rooms.contains(&room) {
            return Ok(false);
        }
        if rooms.len() >= self.max_per_connection {
            return Err(RealtimeError::TooManySubscriptions(self.max_per_connection));
        }

        let mut by_room = self
            .by_room
            .write()
            .map_err(|_| RealtimeError::Internal("Lock poisoned".into()))?;
        by_room
            .entry(room.clone())
            .or_default()
            .insert(connection_id.to_string());
        rooms.insert(room);

        Ok(true)
    }

    /// Remove a connection from every room. Returns the number of rooms left.
    pub fn unsubscribe_all(&self, connection_id: &str) -> usize {
        let rooms = match self.by_connection.write() {
            Ok(mut by_conn) => by_conn.remove(connection_id).unwrap_or_default(),
            Err(_) => return 0,
        };

        if let Ok(mut by_room) = self.by_room.write() {
            for room in &rooms {
                if let Some(members) = by_room.get_mut(room) {
                    members.remove(connection_id);
                    if members.is_empty() {
                        by_room.remove(room);
                    }
                }
            }
        }

        rooms.len()
    }

    /// Rooms a connection is in, sorted by name
    pub fn rooms_of(&self, connection_id: &str) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .by_connection
            .read()
            .map(|by_conn| {
                by_conn
                    .get(connection_id)
                    .map(|rooms| rooms.iter().map(Room::to_string).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    /// Total number of memberships
    pub fn len(&self) -> usize {
        self.by_connection
            .read()
            .map(|by_conn| by_conn.values().map(HashSet::len).sum())
            .unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SubscriptionHook for SubscriptionRegistry {
    fn subscribe(&self, connection_id: &str, model: &ModelDef, records: &[Value]) -> RealtimeResult<usize> {
        let mut joined = 0;
        for record in records {
            let key = model
                .primary_key_of(record)
                .ok_or_else(|| RealtimeError::MissingPrimaryKey(model.identity.clone()))?;
            if self.join(connection_id, Room::record(&model.identity, key))? {
                joined += 1;
            }
        }
        Ok(joined)
    }

    fn watch(&self, connection_id: &str, model: &ModelDef) -> RealtimeResult<()> {
        self.join(connection_id, Room::creation(&model.identity))?;
        Ok(())
    }

    fn subscribe_deep(&self, connection_id: &str, model: &ModelDef, record: &Value) -> RealtimeResult<usize> {
        let mut joined = 0;
        for association in &model.associations {
            let target = self
                .models
                .get(&association.target)
                .ok_or_else(|| RealtimeError::UnknownModel(association.target.clone()))?;

            for key in association.related_keys(record, &target.primary_key) {
                if self.join(connection_id, Room::record(&target.identity, &key))? {
                    joined += 1;
                }
            }
        }
        Ok(joined)
    }
}
