use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use shared::constants::{INVALID_PIX_ID_ERROR, INVALID_PIX_VALUE_ERROR, MISSING_PIX_ID_ERROR};
use shared::pix::{CreatePixRequest, CreatePixResponse, PixStatusResponse};
use shared::validation::{validate_pix_id, validate_pix_value};

use crate::error::ApiError;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_pix))
        .route("/check-by-pixid/:id", get(check_by_pix_id))
        .route("/check", get(check_by_query))
}

#[derive(Debug, Deserialize)]
struct PixIdQuery {
    id: Option<String>,
}

/// A body that is not JSON, or has no usable `value`, gets the same 422 as
/// an out-of-range amount.
async fn create_pix(
    State(state): State<AppState>,
    payload: Result<Json<CreatePixRequest>, JsonRejection>,
) -> Result<Json<CreatePixResponse>, ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::Validation(INVALID_PIX_VALUE_ERROR.to_string()))?;
    let value = validate_pix_value(&request.value)
        .map_err(|_| ApiError::Validation(INVALID_PIX_VALUE_ERROR.to_string()))?;

    let created = state.pushinpay.create_pix(value).await?;
    Ok(Json(created))
}

async fn check_by_pix_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PixStatusResponse>, ApiError> {
    check(&state, Some(id)).await
}

async fn check_by_query(
    State(state): State<AppState>,
    Query(query): Query<PixIdQuery>,
) -> Result<Json<PixStatusResponse>, ApiError> {
    check(&state, query.id).await
}

async fn check(state: &AppState, id: Option<String>) -> Result<Json<PixStatusResponse>, ApiError> {
    let id = id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest(MISSING_PIX_ID_ERROR.to_string()))?;
    validate_pix_id(&id).map_err(|_| ApiError::BadRequest(INVALID_PIX_ID_ERROR.to_string()))?;

    let status = state.pushinpay.check_status(&id).await?;
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    use crate::test_support::*;

    #[tokio::test]
    async fn create_pix_returns_formatted_code() {
        let (app, upstream) = test_app().await;
        let (status, _, body) = send(&app, json_request("POST", "/api/pix/create", json!({ "value": 1990 }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "pix-1");
        assert_eq!(body["copiaCola"], "00020126580014br.gov.bcb.pix");
        assert_eq!(body["qrCode"], "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(body["original"]["status"], "created");

        let calls = upstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].body, json!({ "value": 1990, "webhook_url": "https://hooks.example.com/pix" }));
        assert_eq!(
            calls[0].headers.get("authorization").unwrap(),
            &format!("Bearer {}", PROVIDER_TOKEN)
        );
    }

    #[tokio::test]
    async fn create_pix_rejects_invalid_values_without_calling_provider() {
        let (app, upstream) = test_app().await;
        for body in [json!({ "value": 49 }), json!({ "value": 100.5 }), json!({ "value": "100" }), json!({})] {
            let (status, _, response) = send(&app, json_request("POST", "/api/pix/create", body)).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert!(response["message"].is_string());
        }
        let (status, _, _) = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/api/pix/create")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn create_pix_accepts_whole_number_floats() {
        let (app, upstream) = test_app().await;
        let (status, _, body) =
            send(&app, json_request("POST", "/api/pix/create", json!({ "value": 1990.0 }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "pix-1");
        let calls = upstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].body["value"], json!(1990));
    }

    #[tokio::test]
    async fn create_pix_relays_provider_errors() {
        let (app, _) = test_app().await;
        let (status, _, body) =
            send(&app, json_request("POST", "/api/pix/create", json!({ "value": REJECTED_VALUE }))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "message": "Unauthenticated." }));
    }

    #[tokio::test]
    async fn check_reports_status() {
        let (app, _) = test_app().await;

        let (status, _, body) = send(&app, get_request("/api/pix/check-by-pixid/paid-1", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "paid");
        assert_eq!(body["paid_at"], "2024-11-29T10:00:00Z");

        let (status, _, body) = send(&app, get_request("/api/pix/check?id=tx-9", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "tx-9");
        assert_eq!(body["status"], "pending");
        assert_eq!(body["value"], 1990);
    }

    #[tokio::test]
    async fn check_requires_id_and_relays_not_found() {
        let (app, upstream) = test_app().await;

        let (status, _, _) = send(&app, get_request("/api/pix/check", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _, _) = send(&app, get_request("/api/pix/check?id=%20", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(upstream.calls().is_empty());

        let (status, _, body) = send(&app, get_request("/api/pix/check-by-pixid/missing", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Transaction not found");
    }

    #[tokio::test]
    async fn check_rejects_ids_that_are_not_a_single_segment() {
        let (app, upstream) = test_app().await;

        for uri in [
            "/api/pix/check?id=../pix/cashIn",
            "/api/pix/check?id=../x",
            "/api/pix/check?id=tx%3Fexpand%3D1",
            "/api/pix/check-by-pixid/..%2Fsecret",
        ] {
            let (status, _, body) = send(&app, get_request(uri, None)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["message"].is_string());
        }
        assert!(upstream.calls().is_empty());
    }
}
