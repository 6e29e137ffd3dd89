//! # Real-Time Errors
//!
//! Error types for the real-time module.

use thiserror::Error;

/// Result type for real-time operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Real-time errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    // ==================
    // Subscription Errors
    // ==================
    /// Too many subscriptions
    #[error("Too many subscriptions (max: {0})")]
    TooManySubscriptions(usize),

    /// Association target is not a registered model
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Record has no usable primary key
    #[error("Record of '{0}' has no primary key")]
    MissingPrimaryKey(String),

    // ==================
    // Internal Errors
    // ==================
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
