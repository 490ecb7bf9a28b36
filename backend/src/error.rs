use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use shared::constants::{ALREADY_PLAYED_ERROR, WHEEL_INACTIVE_ERROR};
use thiserror::Error;

/// Errors surfaced by the HTTP handlers.
///
/// Provider failures keep the provider's status and body so the front end
/// sees exactly what PushinPay, TikTok or Meta answered.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("upstream responded with {status}")]
    Upstream { status: StatusCode, body: Value },
    #[error("{message}: {error}")]
    Internal { message: String, error: String },
    #[error("wheel already played")]
    AlreadyPlayed,
    #[error("wheel inactive")]
    WheelInactive,
}

impl ApiError {
    pub fn internal(message: &str, error: impl std::fmt::Display) -> Self {
        ApiError::Internal {
            message: message.to_string(),
            error: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "message": message }))
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "message": message })),
            ApiError::Upstream { status, body } => (status, body),
            ApiError::Internal { message, error } => {
                tracing::error!("{}: {}", message, error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": message, "error": error }),
                )
            }
            ApiError::AlreadyPlayed => (StatusCode::CONFLICT, json!({ "message": ALREADY_PLAYED_ERROR })),
            ApiError::WheelInactive => (StatusCode::NOT_FOUND, json!({ "message": WHEEL_INACTIVE_ERROR })),
        };

        (status, Json(body)).into_response()
    }
}
