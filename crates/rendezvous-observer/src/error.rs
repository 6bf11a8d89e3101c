//! Error types for the Observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rendezvous_core::EngineError;

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A malformed id, body or query parameter, or a role mismatch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The resource already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The generation capability failed.
    #[error("generation failed: {0}")]
    GenerationFailure(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for ObserverError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(msg) => Self::NotFound(msg),
            EngineError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            EngineError::AlreadyExists(msg) => Self::AlreadyExists(msg),
            EngineError::GenerationFailure(msg) => Self::GenerationFailure(msg),
            EngineError::Storage(msg) => Self::Internal(msg),
        }
    }
}

impl ObserverError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::GenerationFailure(_) => StatusCode::BAD_GATEWAY,
            Self::Serialization(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::NotFound(msg)
            | Self::InvalidArgument(msg)
            | Self::AlreadyExists(msg)
            | Self::GenerationFailure(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::Serialization(e) => format!("JSON error: {e}"),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
