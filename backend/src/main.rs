use std::sync::Arc;

use axum::http::header::HeaderName;
use axum::http::{HeaderValue, Method};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use redis::Client as RedisClient;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{Catalog, Config};
use crate::services::ad_events::AdEventForwarder;
use crate::services::play_store::PlayRecordStore;
use crate::services::pushinpay::PushinPayClient;

mod config;
mod error;
mod logging;
mod routes;
mod services;
mod session;

#[cfg(test)]
mod test_support;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub pushinpay: PushinPayClient,
    pub ad_events: AdEventForwarder,
    pub plays: PlayRecordStore,
}

impl AppState {
    pub fn new(config: Config, catalog: Catalog, plays: PlayRecordStore) -> Self {
        Self::with_http(config, catalog, plays, reqwest::Client::new())
    }

    pub fn with_http(
        config: Config,
        catalog: Catalog,
        plays: PlayRecordStore,
        http: reqwest::Client,
    ) -> Self {
        let pushinpay = PushinPayClient::new(
            http.clone(),
            config.pushinpay_base_url.clone(),
            config.pushinpay_token.clone(),
            config.webhook_url.clone(),
        );
        let ad_events = AdEventForwarder::new(
            http,
            config.tiktok_events_url.clone(),
            config.tiktok_access_token.clone(),
            config.meta_graph_url.clone(),
            config.meta_access_token.clone(),
            catalog.pixels.clone(),
        );

        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            pushinpay,
            ad_events,
            plays,
        }
    }
}

pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub fn app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                error!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(vec![
            HeaderName::from_static("content-type"),
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true);

    let api = Router::new()
        .route("/health_check", get(health_check))
        .nest("/pix", routes::pix::create_router())
        .nest("/checkout", routes::checkout::create_router())
        .nest("/wheel", routes::wheel::create_router())
        .merge(routes::ad_events::create_router());

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::from_path(".env").ok();
    logging::setup();

    let config = Config::from_env()?;
    let catalog = Catalog::load(&config.checkout_config_path)?;

    let plays = match &config.redis_url {
        Some(url) => {
            info!("Storing wheel results in Redis");
            PlayRecordStore::redis(RedisClient::open(url.as_str())?, config.wheel_record_ttl)
        }
        None => {
            info!("REDIS_URL not set, wheel results are kept in memory");
            PlayRecordStore::memory(config.wheel_record_ttl)
        }
    };

    if !catalog.promotion.active {
        info!("Promotion is inactive, the discount wheel is disabled");
    }

    let bind_addr = config.bind_addr;
    let app = app(AppState::new(config, catalog, plays));

    let listener = TcpListener::bind(bind_addr).await?;
    info!("🚀 Checkout API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
