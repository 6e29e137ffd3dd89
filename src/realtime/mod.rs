//! # Real-Time Module
//!
//! Live-update subscriptions for records returned to socket clients.
//!
//! The find action only talks to the [`SubscriptionHook`] trait; the
//! in-process [`SubscriptionRegistry`] is the default implementation.

pub mod errors;
pub mod subscription;

pub use errors::{RealtimeError, RealtimeResult};
pub use subscription::{Room, SubscriptionRegistry};

use serde_json::Value;

use crate::blueprint::model::ModelDef;

/// Registers socket connections for change notifications
pub trait SubscriptionHook: Send + Sync {
    /// Subscribe the connection to each record. Returns rooms newly joined.
    fn subscribe(&self, connection_id: &str, model: &ModelDef, records: &[Value]) -> RealtimeResult<usize>;

    /// Subscribe the connection to the model's creation stream
    fn watch(&self, connection_id: &str, model: &ModelDef) -> RealtimeResult<()>;

    /// Subscribe the connection to every record directly associated with
    /// `record`
    fn subscribe_deep(&self, connection_id: &str, model: &ModelDef, record: &Value) -> RealtimeResult<usize>;
}
