use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::{json, Value};
use shared::pix::{CreatePixResponse, PixStatus, PixStatusResponse};

use crate::error::ApiError;
use crate::services::read_provider_json;

const CREATE_PIX_ERROR: &str = "Internal error creating PIX";
const CHECK_PIX_ERROR: &str = "Internal error checking PIX";

/// Thin client for the PushinPay cash-in API
#[derive(Clone)]
pub struct PushinPayClient {
    http: Client,
    base_url: String,
    token: String,
    webhook_url: Option<String>,
}

impl PushinPayClient {
    pub fn new(http: Client, base_url: String, token: String, webhook_url: Option<String>) -> Self {
        Self {
            http,
            base_url,
            token,
            webhook_url,
        }
    }

    /// `value` is already validated: whole cents, at least 50.
    pub async fn create_pix(&self, value: i64) -> Result<CreatePixResponse, ApiError> {
        let mut body = json!({ "value": value });
        if let Some(webhook_url) = &self.webhook_url {
            body["webhook_url"] = json!(webhook_url);
        }

        tracing::info!(value, "📤 Creating PIX");

        let response = self
            .http
            .post(format!("{}/pix/cashIn", self.base_url))
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::internal(CREATE_PIX_ERROR, e))?;

        let data = read_provider_json(response, CREATE_PIX_ERROR).await?;
        let created = format_created(data);

        if created.copia_cola.is_empty() {
            let fields: Vec<&str> = created
                .original
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            tracing::error!(pix_id = %created.id, ?fields, "PIX has no copy-paste code");
        } else {
            tracing::info!(pix_id = %created.id, code_len = created.copia_cola.len(), "✅ PIX created");
        }

        Ok(created)
    }

    pub async fn check_status(&self, id: &str) -> Result<PixStatusResponse, ApiError> {
        tracing::info!(pix_id = id, "🔍 Checking PIX");

        let response = self
            .http
            .get(format!("{}/transactions/{}", self.base_url, id))
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ApiError::internal(CHECK_PIX_ERROR, e))?;

        let data = read_provider_json(response, CHECK_PIX_ERROR).await?;
        let status = format_status(data);
        tracing::info!(pix_id = %status.id, status = %status.status, "PIX status");
        Ok(status)
    }
}

// The provider has moved the copy-paste code around between API versions
fn format_created(data: Value) -> CreatePixResponse {
    CreatePixResponse {
        id: id_of(&data),
        copia_cola: first_non_empty(&data, &["/qr_code", "/pix/copia_cola", "/copia_cola"]),
        qr_code: first_non_empty(&data, &["/qr_code_base64", "/pix/qr_code_base64"]),
        original: data,
    }
}

fn format_status(data: Value) -> PixStatusResponse {
    PixStatusResponse {
        id: id_of(&data),
        status: PixStatus::parse(data.get("status").and_then(Value::as_str)),
        value: data.get("value").filter(|v| !v.is_null()).cloned(),
        paid_at: data.get("paid_at").and_then(Value::as_str).map(str::to_string),
        original: data,
    }
}

fn id_of(data: &Value) -> String {
    match data.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    }
}

fn first_non_empty(data: &Value, pointers: &[&str]) -> String {
    pointers
        .iter()
        .filter_map(|p| data.pointer(p).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}
