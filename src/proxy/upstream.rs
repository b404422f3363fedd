//! Upstream forwarding - the next handler behind the bridge
//!
//! Forwards each request as-is to the configured upstream and relays the
//! answer back to the client.
//!
//! ```text
//! Browser → sso-bridge → upstream (secondary service UI)
//!              │
//!        (gate + exchange)
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH, HOST};
use hyper::{HeaderMap, Request, Response};
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, warn};

use crate::middleware::Next;
use crate::types::{BridgeError, Result};

/// Default upper bound on one upstream round trip.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection-scoped headers that must not be forwarded (RFC 9110 §7.6.1).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Reverse proxy to a single upstream.
#[derive(Debug, Clone)]
pub struct UpstreamProxy {
    http_client: reqwest::Client,
    upstream_url: String,
}

impl UpstreamProxy {
    pub fn new(upstream_url: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_UPSTREAM_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| BridgeError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            upstream_url: upstream_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    async fn forward<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Display,
    {
        let (parts, body) = req.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| BridgeError::Upstream(format!("failed to read request body: {}", e)))?
            .to_bytes();

        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target_url = format!("{}{}", self.upstream_url, path);

        let mut headers = strip_hop_by_hop(parts.headers);
        if let Some(host) = headers.remove(HOST) {
            headers.insert(HeaderName::from_static("x-forwarded-host"), host);
        }

        debug!(method = %parts.method, url = %target_url, "Forwarding request upstream");

        let response = self
            .http_client
            .request(parts.method, &target_url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| BridgeError::Upstream(format!("failed to reach upstream: {}", e)))?;

        let status = response.status();
        let mut response_headers = strip_hop_by_hop(response.headers().clone());
        response_headers.remove(CONTENT_LENGTH);

        let body = response
            .bytes()
            .await
            .map_err(|e| {
                BridgeError::Upstream(format!("failed to read upstream response: {}", e))
            })?;

        debug!(status = %status, size = body.len(), "Forwarded upstream response");

        let mut out = Response::new(Full::new(body));
        *out.status_mut() = status;
        *out.headers_mut() = response_headers;
        Ok(out)
    }
}

#[async_trait]
impl<B> Next<B> for UpstreamProxy
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Display,
{
    async fn run(&self, req: Request<B>) -> Response<Full<Bytes>> {
        match self.forward(req).await {
            Ok(response) => response,
            Err(e) => {
                warn!(upstream = %self.upstream_url, error = %e, "Upstream request failed");
                e.into_response()
            }
        }
    }
}

/// Remove hop-by-hop headers, including any named by `Connection`.
fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    let named: Vec<HeaderName> = headers
        .get_all("connection")
        .iter()
        .filter_map(|v: &HeaderValue| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    headers
}
