use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use shared::constants::MISSING_EVENT_FIELDS_ERROR;

use crate::error::ApiError;
use crate::services::ad_events::AdEventRequest;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/tiktok-events", post(tiktok_event))
        .route("/meta-events", post(meta_event))
}

fn read_request(payload: Result<Json<AdEventRequest>, JsonRejection>) -> Result<AdEventRequest, ApiError> {
    payload
        .map(|Json(request)| request)
        .map_err(|_| ApiError::BadRequest(MISSING_EVENT_FIELDS_ERROR.to_string()))
}

async fn tiktok_event(
    State(state): State<AppState>,
    payload: Result<Json<AdEventRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = read_request(payload)?;
    let data = state.ad_events.send_tiktok(&request).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

async fn meta_event(
    State(state): State<AppState>,
    payload: Result<Json<AdEventRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = read_request(payload)?;
    let data = state.ad_events.send_meta(&request).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}
