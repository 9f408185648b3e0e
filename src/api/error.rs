//! Error mapping -- every handler failure becomes `{"error": ...}` JSON.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::incident::{InvalidSeverity, InvalidStatus};
use crate::storage::StoreError;

/// Failures a handler can surface to the client.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(err) => {
                // Log the details server-side, keep the body generic.
                error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Incident not found".to_string()),
            StoreError::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<InvalidStatus> for ApiError {
    fn from(err: InvalidStatus) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<InvalidSeverity> for ApiError {
    fn from(err: InvalidSeverity) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
