//! HTTP error mapping.
//!
//! Every handler returns `Result<T, ApiError>`; the error renders as
//! `{"detail": "<message>"}`. Messages name the failing step ("DB write
//! (user) failed", "Agent error", ...) so callers can tell them apart.

use crate::chat::ChatError;
use crate::storage::StorageError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Initialization failed: {0}")]
    Initialization(StorageError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("session log is not configured")]
    SessionsDisabled,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Chat(ChatError::NotInitialized) => StatusCode::BAD_REQUEST,
            ApiError::SessionsDisabled => StatusCode::NOT_FOUND,
            ApiError::Initialization(_) | ApiError::Chat(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
