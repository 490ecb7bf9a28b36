//! Fake PushinPay, TikTok and Meta endpoints plus a router wired to them.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::{Catalog, Config};
use crate::services::play_store::PlayRecordStore;
use crate::AppState;

pub const PROVIDER_TOKEN: &str = "test-token";
pub const SERVER_TIKTOK_TOKEN: &str = "server-tiktok-token";
pub const SERVER_TIKTOK_PIXEL: &str = "TT-PIXEL";
// Cash-in amount the fake provider refuses with 401
pub const REJECTED_VALUE: i64 = 99_999;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct Upstream {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl Upstream {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, path: String, headers: HeaderMap, query: HashMap<String, String>, body: Value) {
        self.calls.lock().unwrap().push(RecordedCall { path, headers, query, body });
    }
}

async fn cash_in(State(upstream): State<Upstream>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    upstream.record("/api/pix/cashIn".into(), headers, HashMap::new(), body.clone());
    if body["value"] == json!(REJECTED_VALUE) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthenticated." }))).into_response();
    }
    Json(json!({
        "id": "pix-1",
        "qr_code": "00020126580014br.gov.bcb.pix",
        "qr_code_base64": "data:image/png;base64,iVBORw0KGgo=",
        "status": "created",
        "value": body["value"],
    }))
    .into_response()
}

async fn transaction(State(upstream): State<Upstream>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    upstream.record(format!("/api/transactions/{}", id), headers, HashMap::new(), Value::Null);
    match id.as_str() {
        "missing" => (StatusCode::NOT_FOUND, Json(json!({ "message": "Transaction not found" }))).into_response(),
        "paid-1" => Json(json!({
            "id": "paid-1",
            "status": "paid",
            "value": 1990,
            "paid_at": "2024-11-29T10:00:00Z",
        }))
        .into_response(),
        _ => Json(json!({ "id": id, "value": 1990 })).into_response(),
    }
}

async fn tiktok(State(upstream): State<Upstream>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    upstream.record("/tiktok".into(), headers, HashMap::new(), body);
    Json(json!({ "code": 0, "message": "OK" })).into_response()
}

async fn meta(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Path(pixel_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    upstream.record(format!("/graph/{}/events", pixel_id), headers, query, body);
    Json(json!({ "events_received": 1 })).into_response()
}

pub async fn spawn_upstream() -> (SocketAddr, Upstream) {
    let upstream = Upstream::default();
    let app = Router::new()
        .route("/api/pix/cashIn", post(cash_in))
        .route("/api/transactions/:id", get(transaction))
        .route("/tiktok", post(tiktok))
        .route("/graph/:pixel_id/events", post(meta))
        .with_state(upstream.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, upstream)
}

pub fn test_config(addr: SocketAddr) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("PUSHINPAY_TOKEN", PROVIDER_TOKEN.to_string()),
        ("PUSHINPAY_BASE_URL", format!("http://{}/api", addr)),
        ("WEBHOOK_URL", "https://hooks.example.com/pix".to_string()),
        ("TIKTOK_EVENTS_URL", format!("http://{}/tiktok", addr)),
        ("TIKTOK_ACCESS_TOKEN", SERVER_TIKTOK_TOKEN.to_string()),
        ("META_GRAPH_URL", format!("http://{}/graph", addr)),
        ("COOKIE_SECURE", "false".to_string()),
    ]);
    Config::from_lookup(|name| vars.get(name).cloned()).unwrap()
}

pub fn test_catalog() -> Catalog {
    let mut catalog = Catalog::default();
    catalog.pixels.tiktok_pixel_id = Some(SERVER_TIKTOK_PIXEL.to_string());
    catalog
}

pub fn test_state(addr: SocketAddr, catalog: Catalog) -> AppState {
    // Proxy settings from the environment must not catch loopback calls
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    AppState::with_http(
        test_config(addr),
        catalog,
        PlayRecordStore::memory(Duration::from_secs(60)),
        http,
    )
}

pub async fn test_app_with(catalog: Catalog) -> (Router, Upstream) {
    let (addr, upstream) = spawn_upstream().await;
    (crate::app(test_state(addr, catalog)), upstream)
}

pub async fn test_app() -> (Router, Upstream) {
    test_app_with(test_catalog()).await
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

/// `name=value` part of the first Set-Cookie header
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}
