//! Server-side conversion events for TikTok and Meta.
//!
//! Browser pixels get blocked often enough that purchases are mirrored from
//! the server too. Personal identifiers are normalized and SHA-256 hashed
//! here so raw emails and phone numbers never reach the ad platforms.

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use shared::constants::MISSING_EVENT_FIELDS_ERROR;
use shared::pixel_tracking::PixelSettings;
use shared::validation::{normalize_identifier, validate_email};

use crate::error::ApiError;
use crate::services::read_provider_json;

const TIKTOK_EVENT_ERROR: &str = "Internal error sending TikTok event";
const META_EVENT_ERROR: &str = "Internal error sending Meta event";

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdEventRequest {
    pub pixel_id: Option<String>,
    pub access_token: Option<String>,
    pub event_name: Option<String>,
    pub event_id: Option<String>,
    pub value: Option<Value>,
    pub currency: Option<String>,
    pub content_name: Option<String>,
    pub content_type: Option<String>,
    pub content_id: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub external_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub ttclid: Option<String>,
    pub ttp: Option<String>,
    pub fbc: Option<String>,
    pub fbp: Option<String>,
}

/// Pixel, token and event name after falling back to server settings
#[derive(Debug, Clone, PartialEq)]
struct ResolvedEvent {
    pixel_id: String,
    access_token: String,
    event_name: String,
    event_id: String,
}

pub fn hash_identifier(raw: Option<&str>) -> Option<String> {
    normalize_identifier(raw).map(|normalized| hex::encode(Sha256::digest(normalized.as_bytes())))
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

fn resolve(
    request: &AdEventRequest,
    fallback_pixel: Option<&String>,
    fallback_token: Option<&String>,
    now_millis: i64,
) -> Result<ResolvedEvent, ApiError> {
    let pixel_id = non_blank(request.pixel_id.as_ref()).or_else(|| non_blank(fallback_pixel));
    let access_token = non_blank(request.access_token.as_ref()).or_else(|| non_blank(fallback_token));
    let event_name = non_blank(request.event_name.as_ref());

    match (pixel_id, access_token, event_name) {
        (Some(pixel_id), Some(access_token), Some(event_name)) => {
            let event_id = non_blank(request.event_id.as_ref())
                .unwrap_or_else(|| format!("{}-{}", event_name, now_millis));
            Ok(ResolvedEvent {
                pixel_id,
                access_token,
                event_name,
                event_id,
            })
        }
        _ => Err(ApiError::BadRequest(MISSING_EVENT_FIELDS_ERROR.to_string())),
    }
}

fn insert_str(map: &mut Map<String, Value>, key: &str, value: Option<&String>) {
    if let Some(value) = non_blank(value) {
        map.insert(key.to_string(), Value::String(value));
    }
}

fn insert_hashed(map: &mut Map<String, Value>, key: &str, value: Option<&String>) {
    if let Some(hashed) = hash_identifier(value.map(String::as_str)) {
        map.insert(key.to_string(), json!([hashed]));
    }
}

// Malformed addresses would only hash to noise
fn valid_email(request: &AdEventRequest) -> Option<&String> {
    request.email.as_ref().filter(|email| validate_email(email.trim()).is_ok())
}

fn tiktok_payload(request: &AdEventRequest, event: &ResolvedEvent, timestamp: i64) -> Value {
    let mut properties = Map::new();
    if let Some(value) = request.value.as_ref().filter(|v| !v.is_null()) {
        properties.insert("value".to_string(), value.clone());
    }
    insert_str(&mut properties, "currency", request.currency.as_ref());
    insert_str(&mut properties, "content_name", request.content_name.as_ref());
    insert_str(&mut properties, "content_type", request.content_type.as_ref());
    insert_str(&mut properties, "content_id", request.content_id.as_ref());
    insert_str(&mut properties, "url", request.url.as_ref());

    let mut user = Map::new();
    insert_hashed(&mut user, "email", valid_email(request));
    insert_hashed(&mut user, "phone", request.phone.as_ref());
    insert_hashed(&mut user, "external_id", request.external_id.as_ref());
    insert_str(&mut user, "ip", request.ip.as_ref());
    insert_str(&mut user, "user_agent", request.user_agent.as_ref());
    insert_str(&mut user, "ttclid", request.ttclid.as_ref());
    insert_str(&mut user, "ttp", request.ttp.as_ref());

    json!({
        "event_source": "web",
        "event_source_id": event.pixel_id,
        "data": [{
            "event": event.event_name,
            "event_id": event.event_id,
            "timestamp": timestamp,
            "properties": properties,
            "user": user,
        }],
    })
}

fn meta_payload(request: &AdEventRequest, event: &ResolvedEvent, event_time: i64) -> Value {
    let mut user_data = Map::new();
    insert_hashed(&mut user_data, "em", valid_email(request));
    insert_hashed(&mut user_data, "ph", request.phone.as_ref());
    insert_hashed(&mut user_data, "external_id", request.external_id.as_ref());
    insert_str(&mut user_data, "client_ip_address", request.ip.as_ref());
    insert_str(&mut user_data, "client_user_agent", request.user_agent.as_ref());
    insert_str(&mut user_data, "fbc", request.fbc.as_ref());
    insert_str(&mut user_data, "fbp", request.fbp.as_ref());

    let mut custom_data = Map::new();
    if let Some(value) = request.value.as_ref().filter(|v| !v.is_null()) {
        custom_data.insert("value".to_string(), value.clone());
    }
    insert_str(&mut custom_data, "currency", request.currency.as_ref());
    insert_str(&mut custom_data, "content_name", request.content_name.as_ref());
    insert_str(&mut custom_data, "content_type", request.content_type.as_ref());
    if let Some(content_id) = non_blank(request.content_id.as_ref()) {
        custom_data.insert("content_ids".to_string(), json!([content_id]));
    }

    let mut event_json = json!({
        "event_name": event.event_name,
        "event_time": event_time,
        "event_id": event.event_id,
        "action_source": "website",
        "user_data": user_data,
        "custom_data": custom_data,
    });
    if let Some(url) = non_blank(request.url.as_ref()) {
        event_json["event_source_url"] = Value::String(url);
    }

    json!({ "data": [event_json] })
}

/// Forwards conversion events with the server's fallback credentials
#[derive(Clone)]
pub struct AdEventForwarder {
    http: Client,
    tiktok_events_url: String,
    tiktok_access_token: Option<String>,
    meta_graph_url: String,
    meta_access_token: Option<String>,
    pixels: PixelSettings,
}

impl AdEventForwarder {
    pub fn new(
        http: Client,
        tiktok_events_url: String,
        tiktok_access_token: Option<String>,
        meta_graph_url: String,
        meta_access_token: Option<String>,
        pixels: PixelSettings,
    ) -> Self {
        Self {
            http,
            tiktok_events_url,
            tiktok_access_token,
            meta_graph_url,
            meta_access_token,
            pixels,
        }
    }

    pub async fn send_tiktok(&self, request: &AdEventRequest) -> Result<Value, ApiError> {
        let now = chrono::Utc::now();
        let event = resolve(
            request,
            self.pixels.tiktok_pixel_id.as_ref(),
            self.tiktok_access_token.as_ref(),
            now.timestamp_millis(),
        )?;
        let payload = tiktok_payload(request, &event, now.timestamp());

        tracing::info!(event_id = %event.event_id, pixel_id = %event.pixel_id, "📡 TikTok {}", event.event_name);

        let response = self
            .http
            .post(&self.tiktok_events_url)
            .header("Access-Token", &event.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ApiError::internal(TIKTOK_EVENT_ERROR, e))?;

        read_provider_json(response, TIKTOK_EVENT_ERROR).await
    }

    pub async fn send_meta(&self, request: &AdEventRequest) -> Result<Value, ApiError> {
        let now = chrono::Utc::now();
        let event = resolve(
            request,
            self.pixels.facebook_pixel_id.as_ref(),
            self.meta_access_token.as_ref(),
            now.timestamp_millis(),
        )?;
        let payload = meta_payload(request, &event, now.timestamp());

        tracing::info!(event_id = %event.event_id, pixel_id = %event.pixel_id, "📡 Meta {}", event.event_name);

        let response = self
            .http
            .post(format!("{}/{}/events", self.meta_graph_url, event.pixel_id))
            .query(&[("access_token", event.access_token.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| ApiError::internal(META_EVENT_ERROR, e))?;

        read_provider_json(response, META_EVENT_ERROR).await
    }
}
