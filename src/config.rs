//! Configuration for the bridge
//!
//! CLI arguments and environment variable handling using clap, validated into
//! an immutable [`BridgeConfig`] that every request shares.

use clap::Parser;
use hyper::header::HeaderName;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cookies::is_cookie_name;
use crate::exchange::DEFAULT_EXCHANGE_TIMEOUT;
use crate::middleware::InstallationStrategy;
use crate::policy::{
    IdentityResolution, IdentitySecret, IdentityTable, TrustPolicy, DEFAULT_SUBJECT_HEADER,
};
use crate::types::ConfigError;

/// Default name of the secondary service's session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "Auth";

/// SSO bridge - silently trades an upstream identity secret for a session
/// cookie of a secondary service
#[derive(Parser, Clone)]
#[command(name = "sso-bridge")]
#[command(about = "Silent SSO bridge in front of a secondary service")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Where requests are forwarded after the bridge has run
    #[arg(long, env = "UPSTREAM_URL")]
    pub upstream_url: String,

    /// Exact Referer (or Origin) value allowed to trigger an exchange
    #[arg(long, env = "ALLOWED_REFERER", default_value = "")]
    pub allowed_referer: String,

    /// Exact Host value allowed to trigger an exchange
    #[arg(long, env = "ALLOWED_HOST", default_value = "")]
    pub allowed_host: String,

    /// Base URL of the secondary service (token endpoint is appended)
    #[arg(long, env = "SERVICE_URL", default_value = "")]
    pub service_url: String,

    /// Single shared identity secret (single-user mode)
    #[arg(long, env = "SHARED_TOKEN", hide_env_values = true)]
    pub shared_token: Option<String>,

    /// Per-user secrets as NAME=TOKEN (repeatable, or comma-separated in USERS)
    #[arg(long = "user", env = "USERS", value_delimiter = ',', hide_env_values = true)]
    pub users: Vec<String>,

    /// JSON file mapping user name to secret, merged with --user entries
    #[arg(long, env = "USERS_FILE")]
    pub users_file: Option<PathBuf>,

    /// Header carrying the asserted subject in multi-user mode
    #[arg(long, env = "SUBJECT_HEADER", default_value = DEFAULT_SUBJECT_HEADER)]
    pub subject_header: String,

    /// Name of the secondary service's session cookie
    #[arg(long, env = "COOKIE_NAME", default_value = DEFAULT_COOKIE_NAME)]
    pub cookie_name: String,

    /// Cookie Domain attribute (defaults to the allowed host minus its first label)
    #[arg(long, env = "COOKIE_DOMAIN")]
    pub cookie_domain: Option<String>,

    /// Redirect target after the cookie is set (defaults to https://{host}/auth/cookie)
    #[arg(long, env = "LANDING_URL")]
    pub landing_url: Option<String>,

    /// How the issued cookie is installed
    #[arg(
        long,
        env = "INSTALL_STRATEGY",
        value_enum,
        default_value_t = InstallationStrategy::Redirect
    )]
    pub strategy: InstallationStrategy,

    /// Upper bound on the token exchange call in milliseconds
    #[arg(long, env = "EXCHANGE_TIMEOUT_MS", default_value = "5000")]
    pub exchange_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Args {
    /// Validate the arguments and build the shared bridge configuration.
    pub fn build_config(&self) -> Result<BridgeConfig, ConfigError> {
        validate_url("UPSTREAM_URL", &self.upstream_url)?;
        if !self.service_url.is_empty() {
            validate_url("SERVICE_URL", &self.service_url)?;
        }

        if self.exchange_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        if !is_cookie_name(&self.cookie_name) {
            return Err(ConfigError::InvalidCookieName(self.cookie_name.clone()));
        }

        let policy = TrustPolicy::new(
            self.allowed_referer.as_str(),
            self.allowed_host.as_str(),
            self.service_url.as_str(),
        );
        let identities = self.identity_resolution()?;

        let domain = self
            .cookie_domain
            .clone()
            .unwrap_or_else(|| policy.default_cookie_domain());
        if !domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(ConfigError::InvalidCookieDomain(domain));
        }

        let landing_url = match &self.landing_url {
            Some(url) if url.starts_with('/') => url.clone(),
            Some(url) => {
                validate_url("LANDING_URL", url)?;
                url.clone()
            }
            None => policy.default_landing_url(),
        };

        Ok(BridgeConfig {
            policy,
            identities,
            cookie: CookieSettings {
                name: self.cookie_name.clone(),
                domain,
                landing_url,
            },
            strategy: self.strategy,
            exchange_timeout: Duration::from_millis(self.exchange_timeout_ms),
        })
    }

    /// Shared token or per-user table; exactly one must be configured.
    fn identity_resolution(&self) -> Result<IdentityResolution, ConfigError> {
        let mut entries = self
            .users
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_user_entry(index + 1, entry))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(path) = &self.users_file {
            entries.extend(load_users_file(path)?);
        }

        match (&self.shared_token, entries.is_empty()) {
            (Some(_), false) => Err(ConfigError::AmbiguousIdentity),
            (Some(token), true) if token.is_empty() => Err(ConfigError::NoIdentities),
            (Some(token), true) => Ok(IdentityResolution::Fixed(IdentitySecret::new(
                token.as_str(),
            ))),
            (None, true) => Err(ConfigError::NoIdentities),
            (None, false) => {
                let subject_header = HeaderName::from_bytes(self.subject_header.as_bytes())
                    .map_err(|_| ConfigError::InvalidSubjectHeader(self.subject_header.clone()))?;
                Ok(IdentityResolution::Table {
                    table: IdentityTable::try_from_entries(entries)?,
                    subject_header,
                })
            }
        }
    }
}

/// Immutable bridge configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub policy: TrustPolicy,
    pub identities: IdentityResolution,
    pub cookie: CookieSettings,
    pub strategy: InstallationStrategy,
    pub exchange_timeout: Duration,
}

/// Where and under which name the issued cookie lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: String,
    pub domain: String,
    /// Redirect target for [`InstallationStrategy::Redirect`]
    pub landing_url: String,
}

impl BridgeConfig {
    /// Configuration with defaults derived from the policy: cookie `Auth`,
    /// domain from the allowed host, redirect strategy, 5s timeout.
    pub fn new(policy: TrustPolicy, identities: IdentityResolution) -> Self {
        let cookie = CookieSettings {
            name: DEFAULT_COOKIE_NAME.to_string(),
            domain: policy.default_cookie_domain(),
            landing_url: policy.default_landing_url(),
        };
        Self {
            policy,
            identities,
            cookie,
            strategy: InstallationStrategy::Redirect,
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }

    pub fn with_strategy(mut self, strategy: InstallationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie.name = name.into();
        self
    }

    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie.domain = domain.into();
        self
    }

    pub fn with_landing_url(mut self, url: impl Into<String>) -> Self {
        self.cookie.landing_url = url.into();
        self
    }

    pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    /// False when the trust policy is incomplete; the gate then always skips.
    pub fn exchange_enabled(&self) -> bool {
        self.policy.is_complete()
    }
}

/// Parse one `NAME=TOKEN` entry. `index` is 1-based and only used in errors.
fn parse_user_entry(index: usize, entry: &str) -> Result<(String, IdentitySecret), ConfigError> {
    let (name, token) = entry
        .split_once('=')
        .ok_or(ConfigError::InvalidUserEntry { index })?;
    let (name, token) = (name.trim(), token.trim());
    if name.is_empty() || token.is_empty() {
        return Err(ConfigError::InvalidUserEntry { index });
    }
    Ok((name.to_string(), IdentitySecret::new(token)))
}

/// Load `{"name": "token", ...}` from a JSON file.
fn load_users_file(path: &Path) -> Result<Vec<(String, IdentitySecret)>, ConfigError> {
    let users_file_error = |reason: String| ConfigError::UsersFile {
        path: path.to_path_buf(),
        reason,
    };

    let raw = std::fs::read_to_string(path).map_err(|e| users_file_error(e.to_string()))?;
    let users: BTreeMap<String, String> =
        serde_json::from_str(&raw).map_err(|e| users_file_error(e.to_string()))?;

    users
        .into_iter()
        .map(|(name, token)| {
            if name.is_empty() || token.is_empty() {
                return Err(users_file_error(format!(
                    "entry {:?} has an empty name or token",
                    name
                )));
            }
            Ok((name, IdentitySecret::new(token)))
        })
        .collect()
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };
    let url = reqwest::Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {:?}", other))),
    }
}
