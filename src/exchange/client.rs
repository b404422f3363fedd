//! Outbound token exchange
//!
//! One POST to the secondary service per approved request. No retries; the
//! call is bounded by the client timeout and dropped if the request goes away.

use chrono::Utc;
use hyper::header::{ACCEPT, CONTENT_TYPE, COOKIE};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::cookies;
use crate::exchange::credential::{sanitize_cookie_value, SessionCredential};
use crate::exchange::wire::{TokenExchangeBody, TokenExchangeResponse};
use crate::policy::IdentitySecret;
use crate::types::{BridgeError, ExchangeError};

/// Default upper bound on one exchange call.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the gate hands to the exchanger. Built per request, then dropped.
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    pub identity_secret: IdentitySecret,
    /// Cookies of the inbound request, re-sent for session affinity
    pub forwarded_cookies: Vec<(String, String)>,
}

/// Client for the secondary service's token endpoint.
///
/// Cheap to clone: the underlying `reqwest::Client` shares one connection pool.
#[derive(Debug, Clone)]
pub struct Exchanger {
    http_client: reqwest::Client,
    endpoint: String,
    cookie_name: String,
    cookie_domain: String,
}

impl Exchanger {
    /// Build an exchanger for the configured service and cookie settings.
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.exchange_timeout)
            .user_agent(concat!("sso-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(
            http_client,
            config.policy.exchange_endpoint(),
            config.cookie.name.clone(),
            config.cookie.domain.clone(),
        ))
    }

    /// Build an exchanger around an existing client.
    pub fn with_client(
        http_client: reqwest::Client,
        endpoint: String,
        cookie_name: String,
        cookie_domain: String,
    ) -> Self {
        Self {
            http_client,
            endpoint,
            cookie_name,
            cookie_domain,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Trade the identity secret for a session credential.
    pub async fn exchange(
        &self,
        request: &ExchangeRequest,
    ) -> Result<SessionCredential, ExchangeError> {
        let started = Instant::now();
        debug!(
            endpoint = %self.endpoint,
            forwarded_cookies = request.forwarded_cookies.len(),
            "Exchanging identity secret"
        );

        let mut builder = self
            .http_client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&TokenExchangeBody {
                plex_token: request.identity_secret.expose(),
            });

        if let Some(cookie_header) = cookies::format_cookie_header(&request.forwarded_cookies) {
            builder = builder.header(COOKIE, cookie_header);
        }

        let response = builder.send().await.map_err(ExchangeError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::BadStatus(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(ExchangeError::BodyUnreadable)?;

        let parsed: TokenExchangeResponse =
            serde_json::from_slice(&body).map_err(ExchangeError::MalformedJson)?;

        let token = parsed
            .access_token
            .as_deref()
            .map(sanitize_cookie_value)
            .unwrap_or_default();
        if token.is_empty() {
            return Err(ExchangeError::EmptyToken);
        }

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Token exchange succeeded"
        );

        Ok(SessionCredential::issue(
            self.cookie_name.as_str(),
            token,
            self.cookie_domain.as_str(),
            Utc::now(),
        ))
    }

    /// Like [`exchange`](Self::exchange), but gives up as soon as `cancelled`
    /// resolves. The in-flight call is dropped, which aborts it.
    pub async fn exchange_until<F>(
        &self,
        request: &ExchangeRequest,
        cancelled: F,
    ) -> Result<SessionCredential, ExchangeError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.exchange(request) => result,
            _ = cancelled => {
                debug!(endpoint = %self.endpoint, "Token exchange cancelled");
                Err(ExchangeError::Cancelled)
            }
        }
    }
}
