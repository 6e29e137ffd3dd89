//! # Request Context
//!
//! Explicit description of an incoming find request, independent of the
//! transport it arrived on.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::Uri;

use super::errors::{FindError, FindResult};

/// Transport a request arrived on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Plain HTTP request
    Http,
    /// Virtual request over a persistent socket connection
    Socket { connection_id: String },
}

/// Everything the find action reads from a request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Model identity from the path
    pub model: String,

    /// Primary key segment from the path, if any
    pub path_key: Option<String>,

    /// Decoded query parameters
    pub params: HashMap<String, String>,

    pub transport: Transport,
}

impl RequestContext {
    /// HTTP request for a model with the given query parameters
    pub fn http(model: impl Into<String>, params: HashMap<String, String>) -> Self {
        Self {
            model: model.into(),
            path_key: None,
            params,
            transport: Transport::Http,
        }
    }

    /// Parse a blueprint URL such as `/user/find/3?limit=2`.
    ///
    /// Accepted paths: `/:model`, `/:model/find`, `/:model/:id`,
    /// `/:model/find/:id`.
    pub fn from_url(url: &str, transport: Transport) -> FindResult<Self> {
        let uri: Uri = url
            .parse()
            .map_err(|e| FindError::InvalidQueryParam(format!("Invalid URL '{}': {}", url, e)))?;

        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(&uri)
            .map_err(|e| FindError::InvalidQueryParam(format!("Invalid query string: {}", e)))?;

        let (model, path_key) = split_path(uri.path())?;
        Ok(Self {
            model,
            path_key,
            params,
            transport,
        })
    }

    pub fn with_path_key(mut self, key: impl Into<String>) -> Self {
        self.path_key = Some(key.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn over_socket(mut self, connection_id: impl Into<String>) -> Self {
        self.transport = Transport::Socket {
            connection_id: connection_id.into(),
        };
        self
    }

    /// Connection id when the request came over a socket
    pub fn connection_id(&self) -> Option<&str> {
        match &self.transport {
            Transport::Socket { connection_id } => Some(connection_id),
            Transport::Http => None,
        }
    }

    pub fn is_socket(&self) -> bool {
        self.connection_id().is_some()
    }
}

/// Split a blueprint path into model identity and optional key segment
pub fn split_path(path: &str) -> FindResult<(String, Option<String>)> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        [model] => Ok((model.to_string(), None)),
        [model, "find"] => Ok((model.to_string(), None)),
        [model, "find", key] | [model, key] => Ok((model.to_string(), Some(key.to_string()))),
        [] => Err(FindError::UnknownModel(String::new())),
        _ => Err(FindError::InvalidQueryParam(format!(
            "Unsupported blueprint path: {}",
            path
        ))),
    }
}
