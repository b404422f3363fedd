//! Session credential issued after a successful exchange

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::cookies::is_cookie_octet;

/// Fixed validity window of an issued credential, in hours.
///
/// The secondary service's own expiry is deliberately not used.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Path every credential is scoped to.
pub const SESSION_PATH: &str = "/";

/// `SameSite` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// The secondary service's session cookie, ready to be installed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub expires_at: DateTime<Utc>,
}

impl SessionCredential {
    /// Credential with the bridge's fixed cookie policy: `Path=/`, Secure,
    /// readable by the front-end (not HttpOnly), SameSite=Lax, 24h expiry
    /// counted from `issued_at`.
    pub fn issue(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: SESSION_PATH.to_string(),
            secure: true,
            http_only: false,
            same_site: SameSite::Lax,
            expires_at: issued_at + Duration::hours(SESSION_TTL_HOURS),
        }
    }

    /// `Set-Cookie` header value.
    pub fn to_set_cookie(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if !self.domain.is_empty() {
            out.push_str(&format!("; Domain={}", self.domain));
        }
        if !self.path.is_empty() {
            out.push_str(&format!("; Path={}", self.path));
        }
        out.push_str(&format!(
            "; Expires={}",
            self.expires_at.format("%a, %d %b %Y %H:%M:%S GMT")
        ));
        out.push_str(&format!("; SameSite={}", self.same_site));
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("same_site", &self.same_site)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Drop every character that may not appear in a cookie value.
pub fn sanitize_cookie_value(raw: &str) -> String {
    raw.chars().filter(|c| is_cookie_octet(*c)).collect()
}
