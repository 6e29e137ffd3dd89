//! # Result Composer
//!
//! Fixed response contract of the find action: status, headers, body.
//! The same value is rendered as an HTTP response or serialized as the
//! reply to a socket virtual request.

use std::collections::BTreeMap;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use super::errors::{ErrorResponse, FindError};

/// Header carrying the unpaginated match count
pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// CORS header listing response headers visible to browser scripts
pub const EXPOSE_HEADERS_HEADER: &str = "Access-Control-Expose-Headers";

/// Page of records plus the count of every record matching the filter
#[derive(Debug, Clone, PartialEq)]
pub struct FoundRecords {
    pub records: Vec<Value>,
    pub total_count: u64,
}

/// What a find request resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum FindOutcome {
    /// Multi-record find
    Many(FoundRecords),
    /// Primary-key lookup
    One(Value),
}

/// Response of the find action
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl FindResponse {
    /// 200 with a JSON array body and the total-count headers
    pub fn records(found: FoundRecords) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(TOTAL_COUNT_HEADER.to_string(), found.total_count.to_string());
        headers.insert(EXPOSE_HEADERS_HEADER.to_string(), TOTAL_COUNT_HEADER.to_string());

        Self {
            status_code: StatusCode::OK.as_u16(),
            headers,
            body: Value::Array(found.records),
        }
    }

    /// 200 with the single record as body
    pub fn record(record: Value) -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            headers: BTreeMap::new(),
            body: record,
        }
    }

    pub fn error(err: &FindError) -> Self {
        let body = serde_json::to_value(ErrorResponse::from(err)).unwrap_or(Value::Null);
        Self {
            status_code: err.status_code().as_u16(),
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn total_count(&self) -> Option<u64> {
        self.headers
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.parse().ok())
    }

    pub fn is_success(&self) -> bool {
        self.status_code == StatusCode::OK.as_u16()
    }
}

impl From<FindOutcome> for FindResponse {
    fn from(outcome: FindOutcome) -> Self {
        match outcome {
            FindOutcome::Many(found) => Self::records(found),
            FindOutcome::One(record) => Self::record(record),
        }
    }
}

impl From<Result<FindOutcome, FindError>> for FindResponse {
    fn from(result: Result<FindOutcome, FindError>) -> Self {
        match result {
            Ok(outcome) => outcome.into(),
            Err(err) => Self::error(&err),
        }
    }
}

impl IntoResponse for FindResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.body)).into_response();

        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                response.headers_mut().insert(name, value);
            }
        }
        response
    }
}
