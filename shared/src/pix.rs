use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::constants::{PAYMENT_CONFIRMED_CLOSE_MS, PAYMENT_NOT_IDENTIFIED_MESSAGE};

/// Transaction status as reported by the payment provider
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PixStatus {
    Created,
    Pending,
    Paid,
    Canceled,
    Expired,
    #[serde(other)]
    #[strum(disabled)]
    Unknown,
}

impl PixStatus {
    /// Missing statuses are treated as pending
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => PixStatus::Pending,
            Some(s) if s.trim().is_empty() => PixStatus::Pending,
            Some(s) => s.trim().to_ascii_lowercase().parse().unwrap_or(PixStatus::Unknown),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PixStatus::Created => "created",
            PixStatus::Pending => "pending",
            PixStatus::Paid => "paid",
            PixStatus::Canceled => "canceled",
            PixStatus::Expired => "expired",
            PixStatus::Unknown => "unknown",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PixStatus::Paid)
    }
}

impl std::fmt::Display for PixStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// === API Types ===

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePixRequest {
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreatePixResponse {
    pub id: String,
    pub copia_cola: String, // copy-paste payment code
    pub qr_code: String,    // base64 QR image
    pub original: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PixStatusResponse {
    pub id: String,
    pub status: PixStatus,
    pub value: Option<serde_json::Value>,
    pub paid_at: Option<String>,
    pub original: serde_json::Value,
}

/// What the "I already paid" button tells the shopper
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum PaymentPrompt {
    Confirmed { close_after_ms: u32 },
    NotYetIdentified,
}

impl PaymentPrompt {
    pub fn from_status(status: PixStatus) -> Self {
        if status.is_paid() {
            PaymentPrompt::Confirmed {
                close_after_ms: PAYMENT_CONFIRMED_CLOSE_MS,
            }
        } else {
            PaymentPrompt::NotYetIdentified
        }
    }

    /// Text shown when the payment has not arrived yet
    pub fn message(&self) -> Option<&'static str> {
        match self {
            PaymentPrompt::Confirmed { .. } => None,
            PaymentPrompt::NotYetIdentified => Some(PAYMENT_NOT_IDENTIFIED_MESSAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(PixStatus::parse(None), PixStatus::Pending);
        assert_eq!(PixStatus::parse(Some("")), PixStatus::Pending);
        assert_eq!(PixStatus::parse(Some("PAID")), PixStatus::Paid);
        assert_eq!(PixStatus::parse(Some("created")), PixStatus::Created);
        assert_eq!(PixStatus::parse(Some("refunded")), PixStatus::Unknown);
        assert_eq!(PixStatus::Paid.to_string(), "paid");
    }

    #[test]
    fn test_unknown_status_deserializes() {
        let status: PixStatus = serde_json::from_str("\"chargeback\"").unwrap();
        assert_eq!(status, PixStatus::Unknown);
    }

    #[test]
    fn test_payment_prompt() {
        assert_eq!(
            PaymentPrompt::from_status(PixStatus::Paid),
            PaymentPrompt::Confirmed { close_after_ms: 3000 }
        );
        assert_eq!(
            PaymentPrompt::from_status(PixStatus::Pending),
            PaymentPrompt::NotYetIdentified
        );
        assert_eq!(PaymentPrompt::from_status(PixStatus::Paid).message(), None);
        assert_eq!(
            PaymentPrompt::from_status(PixStatus::Expired).message(),
            Some("Payment not identified yet, please try again.")
        );
    }

    #[test]
    fn test_create_response_uses_camel_case() {
        let response = CreatePixResponse {
            id: "abc".into(),
            copia_cola: "000201".into(),
            qr_code: "data:image/png;base64,AAA".into(),
            original: serde_json::json!({}),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["copiaCola"], "000201");
        assert!(json.get("qrCode").is_some());
    }
}
