//! # Find Action Errors
//!
//! Error types for the find blueprint action.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Result type for find operations
pub type FindResult<T> = Result<T, FindError>;

/// Coarse classification of a find failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindErrorKind {
    /// Caller error, raised before any query runs
    BadRequest,
    /// Unknown model or missing record
    NotFound,
    /// Persistence failure during fetch or count
    Storage,
}

/// Find action errors
#[derive(Debug, Clone, Error)]
pub enum FindError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Invalid query parameter
    #[error("Invalid query parameter: {0}")]
    InvalidQueryParam(String),

    /// Invalid `where` clause or loose filter
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Invalid sort expression
    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    /// Field is not an attribute of the model
    #[error("Unknown attribute '{attribute}' on model '{model}'")]
    UnknownAttribute { model: String, attribute: String },

    /// Association is not declared on the model
    #[error("Unknown association '{association}' on model '{model}'")]
    UnknownAssociation { model: String, association: String },

    /// Limit exceeds maximum
    #[error("Limit {0} exceeds maximum {1}")]
    LimitExceeded(usize, usize),

    /// Model not registered
    #[error("Model not found: {0}")]
    UnknownModel(String),

    /// Record not found by primary key
    #[error("No record found with {primary_key} = {value}")]
    NotFound { primary_key: String, value: String },

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Fetch or count failed in the record store
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl FindError {
    /// Classify this error
    pub fn kind(&self) -> FindErrorKind {
        match self {
            FindError::InvalidQueryParam(_)
            | FindError::InvalidFilter(_)
            | FindError::InvalidSort(_)
            | FindError::UnknownAttribute { .. }
            | FindError::UnknownAssociation { .. }
            | FindError::LimitExceeded(_, _) => FindErrorKind::BadRequest,
            FindError::UnknownModel(_) | FindError::NotFound { .. } => FindErrorKind::NotFound,
            FindError::Storage(_) => FindErrorKind::Storage,
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            FindErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            FindErrorKind::NotFound => StatusCode::NOT_FOUND,
            FindErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<&FindError> for ErrorResponse {
    fn from(err: &FindError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for FindError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(&self));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            FindError::InvalidQueryParam("limit".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FindError::LimitExceeded(5000, 1000).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FindError::UnknownModel("ghost".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            FindError::Storage(StoreError::Unavailable("down".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_error_conversion() {
        let err: FindError = StoreError::Query("bad column".to_string()).into();
        assert_eq!(err.kind(), FindErrorKind::Storage);
    }

    #[test]
    fn test_error_body() {
        let err = FindError::InvalidSort("name SIDEWAYS".to_string());
        let body = ErrorResponse::from(&err);
        assert_eq!(body.code, 400);
        assert!(body.error.contains("SIDEWAYS"));
    }
}
