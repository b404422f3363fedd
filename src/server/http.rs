//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Every request except the
//! liveness probe goes through the bridge, then to the upstream proxy.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::middleware::Bridge;
use crate::proxy::UpstreamProxy;
use crate::types::BridgeError;

/// Shared application state
pub struct AppState {
    /// Gate, exchanger and installation strategy
    pub bridge: Bridge,
    /// Next handler for every bridged request
    pub upstream: UpstreamProxy,
}

impl AppState {
    pub fn new(bridge: Bridge, upstream: UpstreamProxy) -> Self {
        Self { bridge, upstream }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>, listen: SocketAddr) -> Result<(), BridgeError> {
    let listener = TcpListener::bind(listen).await?;
    serve(state, listener).await
}

/// Serve connections from an already bound listener.
pub async fn serve(state: Arc<AppState>, listener: TcpListener) -> Result<(), BridgeError> {
    let local_addr = listener.local_addr()?;
    info!(
        "sso-bridge listening on {} (upstream {})",
        local_addr,
        state.upstream.upstream_url()
    );

    if !state.bridge.config().exchange_enabled() {
        warn!("Trust policy incomplete - token exchange disabled, forwarding only");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    if method == Method::GET && (path == "/health" || path == "/healthz") {
        return Ok(health_response());
    }

    // A dropped client drops this future, which aborts any in-flight exchange
    let response = match state.bridge.handle(req, &state.upstream).await {
        Ok(response) => response,
        Err(e) => {
            warn!("[{}] {} {} failed: {}", addr, method, path, e);
            e.into_response()
        }
    };

    Ok(response)
}

/// Liveness probe response
fn health_response() -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });

    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response() {
        let response = health_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }
}
