use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use shared::constants::{
    AUTO_CLOSE_ON_LOSS_MS, INVALID_ROTATION_ERROR, MAX_WHEEL_ROTATION_DEG, SPIN_DURATION_MS,
};
use shared::shared_wheel_game::{
    resolve_session_state, spin, SessionPlayRecord, WheelGame, WheelSessionResponse,
    WheelSpinRequest, WheelSpinResponse,
};

use crate::error::ApiError;
use crate::session::CheckoutSession;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/spin", post(spin_wheel))
}

// Store failures count as "never played"
async fn stored_record(state: &AppState, session: &CheckoutSession) -> Option<SessionPlayRecord> {
    if session.issued {
        return None;
    }
    match state.plays.get(&session.id).await {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(session_id = %session.id, "Could not read wheel result: {}", e);
            None
        }
    }
}

async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<WheelSessionResponse>), ApiError> {
    let promotion = &state.catalog.promotion;
    if !promotion.active {
        return Err(ApiError::WheelInactive);
    }

    let session = CheckoutSession::from_headers(&headers);
    let session_state = resolve_session_state(stored_record(&state, &session).await);
    let game = WheelGame::mount(session_state);

    let mut response_headers = HeaderMap::new();
    session.write_cookie(&mut response_headers, state.config.wheel_record_ttl, state.config.cookie_secure);

    Ok((
        response_headers,
        Json(WheelSessionResponse {
            should_auto_close: session_state.should_auto_close,
            auto_applied_win: session_state.auto_applied_win,
            auto_close_delay_ms: game.auto_close_delay_ms(),
            segments: state.catalog.wheel.segments().to_vec(),
            discount: session_state.auto_applied_win.then(|| promotion.quote()),
        }),
    ))
}

async fn spin_wheel(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<WheelSpinRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<WheelSpinResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let promotion = &state.catalog.promotion;
    if !promotion.active {
        return Err(ApiError::WheelInactive);
    }
    let current_rotation = request.current_rotation;
    if !current_rotation.is_finite() || current_rotation.abs() > MAX_WHEEL_ROTATION_DEG {
        return Err(ApiError::BadRequest(INVALID_ROTATION_ERROR.to_string()));
    }

    let session = CheckoutSession::from_headers(&headers);
    if stored_record(&state, &session).await.is_some() {
        return Err(ApiError::AlreadyPlayed);
    }

    let wheel = &state.catalog.wheel;
    let outcome = {
        let mut rng = rand::thread_rng();
        spin(wheel, promotion.discount_percent() as f64, current_rotation, &mut rng)
    };

    match state
        .plays
        .put_if_absent(&session.id, SessionPlayRecord::from_outcome(&outcome))
        .await
    {
        Ok(true) => {}
        // another spin for this session got there first
        Ok(false) => return Err(ApiError::AlreadyPlayed),
        Err(e) => tracing::warn!(session_id = %session.id, "Could not persist wheel result: {}", e),
    }

    let segment = &wheel.segments()[outcome.segment_index()];
    tracing::info!(
        session_id = %session.id,
        won = outcome.won(),
        "🎡 Wheel landed on {}",
        segment.label
    );

    let mut response_headers = HeaderMap::new();
    session.write_cookie(&mut response_headers, state.config.wheel_record_ttl, state.config.cookie_secure);

    Ok((
        response_headers,
        Json(WheelSpinResponse {
            won: outcome.won(),
            segment_index: outcome.segment_index(),
            segment_label: segment.label.clone(),
            rotation_degrees: outcome.rotation_degrees(),
            spin_duration_ms: SPIN_DURATION_MS,
            auto_close_after_ms: (!outcome.won()).then_some(AUTO_CLOSE_ON_LOSS_MS),
            discount: outcome.won().then(|| promotion.quote()),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::*;

    #[tokio::test]
    async fn fresh_session_is_issued_and_not_auto_closed() {
        let (app, _) = test_app().await;
        let (status, headers, body) = send(&app, get_request("/api/wheel/session", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(session_cookie(&headers).unwrap().starts_with("checkout_session="));
        assert_eq!(body["should_auto_close"], false);
        assert_eq!(body["auto_applied_win"], false);
        assert!(body["auto_close_delay_ms"].is_null());
        assert_eq!(body["segments"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn second_spin_in_session_conflicts() {
        let (app, _) = test_app().await;

        let (status, headers, first) =
            send(&app, json_request("POST", "/api/wheel/spin", json!({ "current_rotation": 0.0 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(first["rotation_degrees"].as_f64().unwrap() >= 5.0 * 360.0);
        let won = first["won"].as_bool().unwrap();
        if won {
            assert_eq!(first["discount"]["discounted_cents"], 4700);
            assert!(first["auto_close_after_ms"].is_null());
        } else {
            assert!(first["discount"].is_null());
            assert_eq!(first["auto_close_after_ms"], 2000);
        }
        let cookie = session_cookie(&headers).unwrap();

        let mut again = json_request("POST", "/api/wheel/spin", json!({ "current_rotation": 2000.0 }));
        again.headers_mut().insert("cookie", cookie.parse().unwrap());
        let (status, _, body) = send(&app, again).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["message"].is_string());

        // the revisit closes the overlay and re-applies a win
        let (status, _, session) = send(&app, get_request("/api/wheel/session", Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["should_auto_close"], true);
        assert_eq!(session["auto_applied_win"], won);
        assert_eq!(session["auto_close_delay_ms"], 500);
    }

    #[tokio::test]
    async fn out_of_range_rotation_is_rejected_without_using_the_spin() {
        let (app, _) = test_app().await;
        let (_, headers, _) = send(&app, get_request("/api/wheel/session", None)).await;
        let cookie = session_cookie(&headers).unwrap();

        let mut request = json_request("POST", "/api/wheel/spin", json!({ "current_rotation": 1.0e16 }));
        request.headers_mut().insert("cookie", cookie.parse().unwrap());
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());

        let mut request = json_request("POST", "/api/wheel/spin", json!({ "current_rotation": 725.0 }));
        request.headers_mut().insert("cookie", cookie.parse().unwrap());
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["rotation_degrees"].as_f64().unwrap() > 725.0);
    }

    #[tokio::test]
    async fn inactive_promotion_hides_wheel() {
        let mut catalog = test_catalog();
        catalog.promotion.active = false;
        let (app, _) = test_app_with(catalog).await;

        let (status, _, _) = send(&app, get_request("/api/wheel/session", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = send(&app, json_request("POST", "/api/wheel/spin", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
