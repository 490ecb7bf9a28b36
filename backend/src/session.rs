use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{Cookie, SameSite};
use shared::constants::SESSION_COOKIE_NAME;
use uuid::Uuid;

/// Anonymous checkout session carried in a cookie
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    pub issued: bool, // minted on this request, cookie still needs setting
}

impl CheckoutSession {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match existing_session_id(headers) {
            Some(id) => Self { id, issued: false },
            None => Self {
                id: Uuid::new_v4().to_string(),
                issued: true,
            },
        }
    }

    /// Sets the cookie on the response when the session is new
    pub fn write_cookie(&self, headers: &mut HeaderMap, max_age: Duration, secure: bool) {
        if !self.issued {
            return;
        }
        let mut cookie = Cookie::new(SESSION_COOKIE_NAME, self.id.clone());
        cookie.set_http_only(true);
        cookie.set_secure(secure);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        let max_age_secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        cookie.set_max_age(time::Duration::seconds(max_age_secs));

        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Failed to encode session cookie: {}", e),
        }
    }
}

// Ids that are not UUIDs are ignored and replaced
fn existing_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw))
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE_NAME)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
        .map(|id| id.to_string())
}
