//! Error types for the object cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the object cache and its HTTP surface.
///
/// Misses and disabled-cache no-ops are not errors; only the persistence
/// boundary, use after `destroy` and request validation produce one.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The cache has been destroyed
    #[error("Cache has been destroyed")]
    Destroyed,

    /// Snapshot file could not be opened, read or written
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A value or snapshot could not be serialized
    #[error("Encoding failed: {0}")]
    Encode(#[source] bincode::Error),

    /// A snapshot stream or compressed payload could not be decoded
    #[error("Decoding failed: {0}")]
    Decode(#[source] bincode::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Destroyed => StatusCode::CONFLICT,
            CacheError::Io(_)
            | CacheError::Encode(_)
            | CacheError::Decode(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the object cache.
pub type Result<T> = std::result::Result<T, CacheError>;
