//! Error types for the bridge
//!
//! Pattern adapted from the gateway error type: one crate-level enum with a
//! status-code mapping, plus narrower enums for the two places that can fail.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use std::path::PathBuf;

/// Startup configuration errors. Any of these stops the bridge from starting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("both a shared token and per-user entries are configured; pick one")]
    AmbiguousIdentity,

    #[error("no identity configured: set SHARED_TOKEN or at least one user entry")]
    NoIdentities,

    /// The entry itself is not echoed because it carries a secret.
    #[error("user entry #{index} is malformed: expected NAME=TOKEN with both parts non-empty")]
    InvalidUserEntry { index: usize },

    #[error("user {0:?} is configured more than once")]
    DuplicateUser(String),

    #[error("failed to load users file {path:?}: {reason}")]
    UsersFile { path: PathBuf, reason: String },

    #[error("{field} {value:?} is not a valid http(s) URL: {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("cookie name {0:?} is not a valid cookie token")]
    InvalidCookieName(String),

    #[error("cookie domain {0:?} may only contain letters, digits, '.' and '-'")]
    InvalidCookieDomain(String),

    #[error("subject header {0:?} is not a valid header name")]
    InvalidSubjectHeader(String),

    #[error("exchange timeout must be greater than zero")]
    InvalidTimeout,
}

/// Failure of the outbound token exchange. Each variant names the step that
/// failed and wraps the underlying cause.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("secondary service unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("secondary service answered with status {0}")]
    BadStatus(StatusCode),

    #[error("failed to read secondary service response: {0}")]
    BodyUnreadable(#[source] reqwest::Error),

    #[error("secondary service response is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("secondary service issued an empty token")]
    EmptyToken,

    #[error("exchange cancelled before the secondary service answered")]
    Cancelled,
}

impl ExchangeError {
    /// Short machine-readable name used in logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "unreachable",
            Self::BadStatus(_) => "bad_status",
            Self::BodyUnreadable(_) => "body_unreadable",
            Self::MalformedJson(_) => "malformed_json",
            Self::EmptyToken => "empty_token",
            Self::Cancelled => "cancelled",
        }
    }

    /// True when the secondary service did not answer within the timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Unreachable(e) | Self::BodyUnreadable(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Main error type for bridge operations
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Token exchange failed: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Exchange(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Exchange(_) => StatusCode::BAD_GATEWAY,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable name used in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Exchange(e) => e.kind(),
            Self::Upstream(_) => "upstream",
            Self::Internal(_) => "internal",
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (status, body.to_string())
    }

    /// Render the error as a JSON response for the client.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let (status, body) = self.into_status_code_and_body();
        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<hyper::Error> for BridgeError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<hyper::header::InvalidHeaderValue> for BridgeError {
    fn from(err: hyper::header::InvalidHeaderValue) -> Self {
        Self::Internal(format!("invalid header value: {}", err))
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
