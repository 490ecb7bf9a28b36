use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use shared::checkout::{Product, Promotion, UpsellOffer};
use shared::pixel_tracking::PixelSettings;
use shared::shared_wheel_game::{
    WheelConfig, WheelConfigError, DEFAULT_LOW_TIER_WEIGHTS, DEFAULT_SEGMENT_PERCENTS,
};
use thiserror::Error;

const DEFAULT_PUSHINPAY_BASE_URL: &str = "https://api.pushinpay.com.br/api";
const DEFAULT_TIKTOK_EVENTS_URL: &str = "https://business-api.tiktok.com/open_api/v1.3/event/track/";
const DEFAULT_META_GRAPH_URL: &str = "https://graph.facebook.com/v18.0";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_CHECKOUT_CONFIG: &str = "checkout.toml";
const DEFAULT_WHEEL_RECORD_TTL_SECS: u64 = 30 * 24 * 60 * 60;
const MAX_WHEEL_RECORD_TTL_SECS: u64 = 365 * 24 * 60 * 60;
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),
    #[error("{name} has an invalid value: {value}")]
    InvalidVar { name: &'static str, value: String },
    #[error("could not read checkout config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed checkout config: {0}")]
    Toml(#[from] toml_edit::de::Error),
    #[error("invalid wheel settings: {0}")]
    Wheel(#[from] WheelConfigError),
}

/// Process settings read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub pushinpay_token: String,
    pub pushinpay_base_url: String,
    pub webhook_url: Option<String>,
    pub tiktok_events_url: String,
    pub tiktok_access_token: Option<String>,
    pub meta_graph_url: String,
    pub meta_access_token: Option<String>,
    pub redis_url: Option<String>,
    pub wheel_record_ttl: Duration,
    pub cookie_secure: bool,
    pub allowed_origins: Vec<String>,
    pub bind_addr: SocketAddr,
    pub checkout_config_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values are treated as unset
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let pushinpay_token = var("PUSHINPAY_TOKEN").ok_or(ConfigError::MissingVar("PUSHINPAY_TOKEN"))?;

        let wheel_record_ttl = match var("WHEEL_RECORD_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| (1..=MAX_WHEEL_RECORD_TTL_SECS).contains(secs))
                .ok_or_else(|| ConfigError::InvalidVar {
                    name: "WHEEL_RECORD_TTL_SECS",
                    value: raw.clone(),
                })?,
            None => DEFAULT_WHEEL_RECORD_TTL_SECS,
        };

        let bind_raw = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|_| ConfigError::InvalidVar {
            name: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        Ok(Self {
            pushinpay_token,
            pushinpay_base_url: trim_base(var("PUSHINPAY_BASE_URL").unwrap_or_else(|| DEFAULT_PUSHINPAY_BASE_URL.to_string())),
            webhook_url: var("WEBHOOK_URL"),
            tiktok_events_url: var("TIKTOK_EVENTS_URL").unwrap_or_else(|| DEFAULT_TIKTOK_EVENTS_URL.to_string()),
            tiktok_access_token: var("TIKTOK_ACCESS_TOKEN"),
            meta_graph_url: trim_base(var("META_GRAPH_URL").unwrap_or_else(|| DEFAULT_META_GRAPH_URL.to_string())),
            meta_access_token: var("META_ACCESS_TOKEN"),
            redis_url: var("REDIS_URL"),
            wheel_record_ttl: Duration::from_secs(wheel_record_ttl),
            cookie_secure: var("COOKIE_SECURE").map(|v| v == "true").unwrap_or(true),
            allowed_origins: var("ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
                .split(',')
                .map(|origin| origin.trim().trim_end_matches('/').to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            bind_addr,
            checkout_config_path: PathBuf::from(
                var("CHECKOUT_CONFIG").unwrap_or_else(|| DEFAULT_CHECKOUT_CONFIG.to_string()),
            ),
        })
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[derive(Debug, Deserialize)]
struct WheelSettings {
    #[serde(default = "default_segments")]
    segments: Vec<u32>,
    #[serde(default = "default_weights")]
    low_tier_weights: Vec<f64>,
}

fn default_segments() -> Vec<u32> {
    DEFAULT_SEGMENT_PERCENTS.to_vec()
}

fn default_weights() -> Vec<f64> {
    DEFAULT_LOW_TIER_WEIGHTS.to_vec()
}

impl Default for WheelSettings {
    fn default() -> Self {
        Self {
            segments: default_segments(),
            low_tier_weights: default_weights(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    product: Product,
    promotion: Promotion,
    #[serde(default)]
    upsells: Vec<UpsellOffer>,
    #[serde(default)]
    pixels: PixelSettings,
    #[serde(default)]
    wheel: WheelSettings,
}

/// What the checkout sells, and how the wheel is laid out
#[derive(Debug, Clone)]
pub struct Catalog {
    pub product: Product,
    pub promotion: Promotion,
    pub upsells: Vec<UpsellOffer>,
    pub pixels: PixelSettings,
    pub wheel: WheelConfig,
}

impl Catalog {
    /// A missing file means built-in defaults; anything unparsable is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("{} not found, using the built-in catalog", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = toml_edit::de::from_str(raw)?;
        let wheel = WheelConfig::from_percents(&file.wheel.segments, file.wheel.low_tier_weights)?;

        Ok(Self {
            product: file.product,
            promotion: file.promotion,
            upsells: file.upsells,
            pixels: file.pixels,
            wheel,
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            product: Product {
                name: "Produto".to_string(),
                price_cents: 9700,
            },
            promotion: Promotion {
                active: true,
                product_price_cents: 9700,
                discount_price_cents: 4700,
            },
            upsells: Vec::new(),
            pixels: PixelSettings::default(),
            wheel: WheelConfig::default(),
        }
    }
}
