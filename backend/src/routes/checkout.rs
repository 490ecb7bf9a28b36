use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use shared::checkout::{build_order, CheckoutConfigResponse, OrderSummary, QuoteRequest, UpsellView};

use crate::error::ApiError;
use crate::session::CheckoutSession;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/config", get(get_config))
        .route("/quote", post(quote))
}

async fn get_config(State(state): State<AppState>) -> Json<CheckoutConfigResponse> {
    let catalog = &state.catalog;
    let promotion = &catalog.promotion;
    let discount = (promotion.active && promotion.discount_percent() > 0).then(|| promotion.quote());

    Json(CheckoutConfigResponse {
        product: catalog.product.clone(),
        promotion: promotion.clone(),
        discount,
        upsells: catalog.upsells.iter().map(UpsellView::from).collect(),
        wheel_segments: catalog.wheel.segments().to_vec(),
        pixels: catalog.pixels.clone(),
    })
}

async fn quote(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<OrderSummary>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let catalog = &state.catalog;

    let session = CheckoutSession::from_headers(&headers);
    let won = if session.issued || !catalog.promotion.active {
        false
    } else {
        match state.plays.get(&session.id).await {
            Ok(record) => record.map(|r| r.won).unwrap_or(false),
            Err(e) => {
                tracing::warn!(session_id = %session.id, "Could not read wheel result: {}", e);
                false
            }
        }
    };

    let order = build_order(
        &catalog.product,
        &catalog.upsells,
        &request.upsell_ids,
        won.then(|| catalog.promotion.quote()),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(order.summary()))
}
