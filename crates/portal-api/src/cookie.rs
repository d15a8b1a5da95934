//! Session cookie lifecycle
//!
//! Login sets `HttpOnly; Path=/; Max-Age=<lifetime>`, logout overwrites the
//! cookie with an empty value and `Max-Age=0`. `Secure` is added when the
//! server runs in production.

use axum::http::{header, HeaderMap};
use chrono::Duration;

/// Default session cookie name
pub const DEFAULT_COOKIE_NAME: &str = "portal_session";

#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Cookie carrying the session token
    pub name: String,
    /// Emit the `Secure` attribute
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            secure: false,
        }
    }
}

impl CookieConfig {
    /// `Set-Cookie` value carrying a freshly issued token
    pub fn session_cookie(&self, token: &str, max_age: Duration) -> String {
        self.render(token, max_age.num_seconds())
    }

    /// `Set-Cookie` value that makes the client drop the session immediately
    pub fn clear_cookie(&self) -> String {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
            self.name, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Find a non-empty cookie value by name across all `Cookie` headers
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}
