//! Carrying session tokens on HTTP requests and responses.

use std::time::Duration;

use axum::http::{header, HeaderMap};

/// Pulls a raw session token out of request headers.
///
/// Absence is a normal state (anonymous request), not an error.
pub trait TokenExtractor: Send + Sync {
    fn extract(&self, headers: &HeaderMap) -> Option<String>;
}

/// Writes, reads and clears the session cookie.
#[derive(Debug, Clone)]
pub struct CookieTransport {
    pub name: String,
    pub secure: bool,
    pub max_age: Duration,
}

impl CookieTransport {
    pub fn new(name: impl Into<String>, secure: bool, max_age: Duration) -> Self {
        Self {
            name: name.into(),
            secure,
            max_age,
        }
    }

    fn attributes(&self, max_age: u64) -> String {
        let mut attrs = format!("HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");
        if self.secure {
            attrs.push_str("; Secure");
        }
        attrs
    }

    /// `Set-Cookie` value carrying `token`.
    pub fn set_auth_cookie(&self, token: &str) -> String {
        format!("{}={}; {}", self.name, token, self.attributes(self.max_age.as_secs()))
    }

    /// `Set-Cookie` value that makes the browser drop the session cookie.
    pub fn clear_auth_cookie(&self) -> String {
        format!("{}=; {}", self.name, self.attributes(0))
    }

    /// Find the session cookie across every `Cookie` header on the request.
    pub fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|cookie| cookie.trim().split_once('='))
            .find(|(name, value)| *name == self.name && !value.is_empty())
            .map(|(_, value)| value.to_string())
    }
}

impl TokenExtractor for CookieTransport {
    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        self.extract_token(headers)
    }
}

/// Reads the token from `Authorization: Bearer <token>` instead of a cookie.
#[derive(Debug, Clone, Default)]
pub struct BearerExtractor;

impl TokenExtractor for BearerExtractor {
    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }
}
