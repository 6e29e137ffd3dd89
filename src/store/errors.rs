//! Record store errors

use thiserror::Error;

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a record store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backing store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Store rejected or failed to run the query
    #[error("query failed: {0}")]
    Query(String),

    /// Internal store error
    #[error("internal store error: {0}")]
    Internal(String),
}
