//! Errors surfaced to HTTP callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::storage::StoreError;
use crate::wire::{ParseError, SerializeError};

/// Failure of a capture or replay, mapped to a status code.
#[derive(Debug, thiserror::Error)]
pub enum DropError {
    /// Unknown (or impossible) drop ID.
    #[error("drop not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Store(StoreError),

    #[error("stored drop is malformed: {0}")]
    Parse(#[from] ParseError),

    #[error("failed to capture request: {0}")]
    Serialize(#[from] SerializeError),
}

impl From<StoreError> for DropError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => DropError::NotFound,
            other => DropError::Store(other),
        }
    }
}

impl DropError {
    pub fn status(&self) -> StatusCode {
        match self {
            DropError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `not_found` or `error`, for metrics labels.
    pub fn outcome(&self) -> &'static str {
        match self {
            DropError::NotFound => "not_found",
            _ => "error",
        }
    }
}

impl IntoResponse for DropError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Drop request failed");
        }

        let message = self.to_string().lines().collect::<Vec<_>>().join(" ");
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
