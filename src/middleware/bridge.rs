//! The bridge middleware step
//!
//! ```text
//! request → Gate ──Skip──────────────────────────────→ next
//!             │
//!          Exchange → Exchanger ──Err──→ error response (next not called)
//!                          │
//!                          Ok → install (redirect | inline) → next
//! ```
//!
//! The next handler runs exactly once on every path except a failed exchange.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Response};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::exchange::{ExchangeRequest, Exchanger};
use crate::middleware::install::{self, InstallationStrategy};
use crate::policy::{Gate, GateDecision, RequestMeta};
use crate::types::Result;

/// The rest of the host pipeline.
#[async_trait]
pub trait Next<B: Send + 'static>: Send + Sync {
    async fn run(&self, req: Request<B>) -> Response<Full<Bytes>>;
}

/// Gate + exchanger + installation over one shared configuration.
#[derive(Debug, Clone)]
pub struct Bridge {
    config: Arc<BridgeConfig>,
    exchanger: Exchanger,
}

impl Bridge {
    pub fn new(config: Arc<BridgeConfig>) -> Result<Self> {
        let exchanger = Exchanger::new(&config)?;
        Ok(Self { config, exchanger })
    }

    /// Use a prepared exchanger, e.g. one with a custom client.
    pub fn with_exchanger(config: Arc<BridgeConfig>, exchanger: Exchanger) -> Self {
        Self { config, exchanger }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Run the bridge for one request, then hand it to `next`.
    ///
    /// Returns `Err` only when an approved exchange failed; the caller turns it
    /// into an error response and `next` is never invoked for that request.
    pub async fn handle<B, N>(
        &self,
        mut req: Request<B>,
        next: &N,
    ) -> Result<Response<Full<Bytes>>>
    where
        B: Send + 'static,
        N: Next<B> + ?Sized,
    {
        let meta = RequestMeta::from_request(&req, self.config.identities.subject_header());

        let identity_secret = match Gate::from_config(&self.config).evaluate(&meta) {
            GateDecision::Skip => return Ok(next.run(req).await),
            GateDecision::Exchange(secret) => secret,
        };

        let host = meta.host.clone().unwrap_or_default();
        let subject = meta.subject.clone().unwrap_or_default();
        let exchange = ExchangeRequest {
            identity_secret,
            forwarded_cookies: meta.cookies,
        };

        let credential = match self.exchanger.exchange(&exchange).await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(
                    host = %host,
                    subject = %subject,
                    kind = e.kind(),
                    error = %e,
                    "Token exchange failed, aborting request"
                );
                return Err(e.into());
            }
        };

        info!(
            host = %host,
            subject = %subject,
            strategy = %self.config.strategy,
            "Issued session cookie"
        );

        match self.config.strategy {
            InstallationStrategy::Redirect => {
                let redirect =
                    install::redirect_response(&credential, &self.config.cookie.landing_url)?;
                // The redirect is already decided; downstream still runs once
                let downstream = next.run(req).await;
                debug!(
                    status = %downstream.status(),
                    "Discarding downstream response in favour of redirect"
                );
                Ok(redirect)
            }
            InstallationStrategy::Inline => {
                install::attach_to_request(&mut req, &credential)?;
                Ok(next.run(req).await)
            }
        }
    }
}
