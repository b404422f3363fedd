//! sso-bridge - silent single sign-on in front of a secondary service
//!
//! A user who already proved their identity upstream carries a per-user
//! secret. When such a request arrives from the trusted portal for the trusted
//! host and has no session yet, the bridge trades the secret for the secondary
//! service's session cookie so the user never sees its login page.
//!
//! ## Components
//!
//! - **Gate** ([`policy::Gate`]): pure decision over request metadata and the
//!   static trust policy
//! - **Exchanger** ([`exchange::Exchanger`]): one bounded POST to the service's
//!   token endpoint, producing a [`exchange::SessionCredential`]
//! - **Bridge** ([`middleware::Bridge`]): runs both, installs the cookie by
//!   redirect or inline, and calls the next handler exactly once
//! - **Upstream proxy** ([`proxy::UpstreamProxy`]): the next handler used by
//!   the standalone server

pub mod config;
pub mod cookies;
pub mod exchange;
pub mod middleware;
pub mod policy;
pub mod proxy;
pub mod server;
pub mod types;

pub use config::{Args, BridgeConfig, CookieSettings};
pub use middleware::{Bridge, InstallationStrategy, Next};
pub use server::{run, AppState};
pub use types::{BridgeError, ConfigError, ExchangeError, Result};
