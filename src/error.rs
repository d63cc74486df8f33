//! Error taxonomy of the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

// ---

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or unparseable input. Never reaches the store.
    #[error("{0}")]
    Validation(String),
    /// A referenced barn, silo or environmental unit does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Anything the persistence layer reported. `context` is what the
    /// caller sees; the source is only logged.
    #[error("{context}: {source}")]
    Persistence {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Attach a caller-facing message to a store failure.
pub trait StoreContext<T> {
    fn context(self, context: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreContext<T> for Result<T, StoreError> {
    fn context(self, context: &'static str) -> Result<T, ApiError> {
        self.map_err(|source| ApiError::Persistence { context, source })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status();
        let message = match &self {
            ApiError::Persistence { context, source } => {
                tracing::error!("{}: {}", context, source);
                context.to_string()
            }
            other => {
                tracing::debug!("Rejecting request ({}): {}", status, other);
                other.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
