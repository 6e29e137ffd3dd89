//! # Record Store
//!
//! The persistence seam of the find action. The action never touches
//! storage directly; it is handed a [`RecordStore`] at construction.
//!
//! Records are JSON objects. Both trait methods are independent queries:
//! a store is not required to serve `find` and `count` from one snapshot.

mod errors;
mod memory;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::blueprint::filter::QueryFilter;
use crate::blueprint::model::ModelDef;
use crate::blueprint::plan::QueryPlan;

/// Async access to a record collection per model
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records matching the plan's filter, sorted, paginated, populated and
    /// projected
    async fn find(&self, model: &ModelDef, plan: &QueryPlan) -> StoreResult<Vec<Value>>;

    /// Number of records matching `filter`, ignoring pagination
    async fn count(&self, model: &ModelDef, filter: &QueryFilter) -> StoreResult<u64>;

    /// Single record by primary key with the named associations expanded
    async fn find_one(
        &self,
        model: &ModelDef,
        key: &Value,
        populate: &[String],
    ) -> StoreResult<Option<Value>>;
}
