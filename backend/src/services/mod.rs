use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::error::ApiError;

pub mod ad_events;
pub mod play_store;
pub mod pushinpay;

/// Reads a provider response as JSON. Non-2xx answers become
/// `ApiError::Upstream` carrying the provider's status and body.
pub(crate) async fn read_provider_json(
    response: reqwest::Response,
    context: &str,
) -> Result<Value, ApiError> {
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let text = response.text().await.map_err(|e| ApiError::internal(context, e))?;

    let body = if text.trim().is_empty() {
        json!({})
    } else {
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => json!({ "message": text }),
            Err(e) => return Err(ApiError::internal(context, e)),
        }
    };

    if !status.is_success() {
        tracing::error!("{} ({}): {}", context, status, body);
        return Err(ApiError::Upstream { status, body });
    }
    Ok(body)
}
