//! Error types for the tiered cache
//!
//! Provides unified error handling using thiserror. Infrastructure errors
//! (`Connection`, `Protocol`, `Serialization`) never leave the cache manager;
//! they are logged and converted to safe defaults there. The remaining
//! variants belong to the admin HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the tiered cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Remote store unreachable, timed out, or connection closed
    #[error("Connection failure: {0}")]
    Connection(String),

    /// Remote store answered with something malformed or unexpected
    #[error("Protocol failure: {0}")]
    Protocol(String),

    /// Payload could not be encoded or decoded
    #[error("Serialization failure: {0}")]
    Serialization(String),

    /// Key not found in either tier
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CacheError::Connection(_))
    }
}

// == Conversions ==
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_timeout()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
        {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Protocol(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Protocol(_) => StatusCode::BAD_GATEWAY,
            CacheError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the tiered cache.
pub type Result<T> = std::result::Result<T, CacheError>;
