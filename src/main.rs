//! sso-bridge - silent single sign-on in front of a secondary service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sso_bridge::{config::Args, proxy::UpstreamProxy, server, AppState, Bridge};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("sso_bridge={},info", log_level).into()),
    );
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = match args.build_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("======================================");
    info!("  sso-bridge");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Upstream: {}", args.upstream_url);
    info!("Allowed referer: {}", config.policy.allowed_origin());
    info!("Allowed host: {}", config.policy.allowed_target_host());
    info!("Token endpoint: {}", config.policy.exchange_endpoint());
    info!("Identities: {}", config.identities.identity_count());
    info!(
        "Cookie: {} (domain {:?})",
        config.cookie.name, config.cookie.domain
    );
    info!("Strategy: {}", config.strategy);
    info!("Exchange timeout: {:?}", config.exchange_timeout);
    info!("======================================");

    let bridge = Bridge::new(Arc::new(config))?;
    let upstream = UpstreamProxy::new(&args.upstream_url)?;
    let state = Arc::new(AppState::new(bridge, upstream));

    server::run(state, args.listen).await?;
    Ok(())
}
