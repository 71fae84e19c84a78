//! Error types for the caching proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the caching proxy.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key was never stored
    #[error("no such key")]
    NoSuchKey,

    /// Key is stored but its TTL has elapsed
    #[error("ttl expired")]
    Expired,

    /// Shared state is in an unexpected shape
    #[error("Internal error: {0}")]
    Internal(String),

    /// Gzip encoding failed
    #[error("Compression failed: {0}")]
    Compression(#[from] std::io::Error),

    /// Origin response body could not be buffered
    #[error("Response body error: {0}")]
    Body(String),

    /// Origin could not be reached or answered with a transport error
    #[error("Origin error: {0}")]
    Origin(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// Returns true for lookup outcomes that callers treat as a cache miss.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NoSuchKey | CacheError::Expired)
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Origin(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching proxy.
pub type Result<T> = std::result::Result<T, CacheError>;
