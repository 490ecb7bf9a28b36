use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use validator::ValidationError;

use crate::constants::MIN_PIX_VALUE_CENTS;

static PIX_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// PIX amounts are whole cents, at least 50. Whole-number floats such as
/// `100.0` count as integers; `49.5` and numeric strings are rejected.
pub fn validate_pix_value(value: &Value) -> Result<i64, ValidationError> {
    let cents = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    });
    match cents {
        Some(cents) if cents >= MIN_PIX_VALUE_CENTS => Ok(cents),
        Some(_) => Err(ValidationError::new("pix_value_below_minimum")),
        None => Err(ValidationError::new("pix_value_not_integer")),
    }
}

/// Transaction ids end up in the provider's URL path, so only a single
/// plain segment is accepted.
pub fn validate_pix_id(id: &str) -> Result<&str, ValidationError> {
    if PIX_ID.is_match(id) {
        Ok(id)
    } else {
        Err(ValidationError::new("invalid_pix_id"))
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || !email.contains('@') {
        return Err(ValidationError::new("invalid_email_format"));
    }
    Ok(())
}

/// Trimmed, lowercased identifier ready for hashing; `None` when blank
pub fn normalize_identifier(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pix_value() {
        assert_eq!(validate_pix_value(&json!(50)).ok(), Some(50));
        assert_eq!(validate_pix_value(&json!(19700)).ok(), Some(19700));
        assert!(validate_pix_value(&json!(49)).is_err());
        assert!(validate_pix_value(&json!(0)).is_err());
        assert!(validate_pix_value(&json!(-100)).is_err());
        assert_eq!(validate_pix_value(&json!(100.0)).ok(), Some(100));
        assert_eq!(validate_pix_value(&json!(1990.0)).ok(), Some(1990));
        assert!(validate_pix_value(&json!(49.0)).is_err());
        assert!(validate_pix_value(&json!(100.5)).is_err());
        assert!(validate_pix_value(&json!(1.0e19)).is_err());
        assert!(validate_pix_value(&json!("100")).is_err());
        assert!(validate_pix_value(&Value::Null).is_err());
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier(Some("  Foo@Bar.COM ")), Some("foo@bar.com".into()));
        assert_eq!(normalize_identifier(Some("   ")), None);
        assert_eq!(normalize_identifier(None), None);
    }

    #[test]
    fn test_pix_id() {
        assert_eq!(validate_pix_id("9c1f3a2e-77b0-4d1e-a1f2-0c9b8e7d6f5a").ok(), Some("9c1f3a2e-77b0-4d1e-a1f2-0c9b8e7d6f5a"));
        assert!(validate_pix_id("tx_9").is_ok());
        assert!(validate_pix_id("../pix/cashIn").is_err());
        assert!(validate_pix_id("a/b").is_err());
        assert!(validate_pix_id("a?b=1").is_err());
        assert!(validate_pix_id("").is_err());
    }

    #[test]
    fn test_email() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("ab.com").is_err());
    }
}
