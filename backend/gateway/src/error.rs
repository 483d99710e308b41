//! API errors and their JSON envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use dprscope_core::DprError;

/// Errors returned by handlers, rendered as `{"error": message}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// A 500 whose `message` is safe to show; `detail` is only logged.
    #[error("{message}: {detail}")]
    Failed {
        message: &'static str,
        detail: String,
    },
    /// An upload whose review ended in `failed`.
    #[error("DPR processing failed: {detail}")]
    ReviewFailed { id: Option<Uuid>, detail: String },
}

impl ApiError {
    pub fn failed(message: &'static str, err: impl ToString) -> Self {
        ApiError::Failed {
            message,
            detail: err.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Failed { .. } | ApiError::ReviewFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(message) | ApiError::NotFound(message) => json!({ "error": message }),
            ApiError::Failed { message, detail } => {
                tracing::error!(%detail, "{message}");
                json!({ "error": message })
            }
            ApiError::ReviewFailed { id, detail } => {
                tracing::error!(record_id = ?id, %detail, "DPR processing failed");
                match id {
                    Some(id) => json!({ "error": "DPR processing failed", "id": id }),
                    None => json!({ "error": "DPR processing failed" }),
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<DprError> for ApiError {
    fn from(err: DprError) -> Self {
        match err {
            DprError::MissingInput(m) | DprError::InvalidInput(m) => ApiError::BadRequest(m),
            DprError::NotFound(_) => ApiError::NotFound("DPR not found".into()),
            other => ApiError::failed("Internal server error", other),
        }
    }
}
