//! Exchange gate
//!
//! Decides, per request, whether a silent token exchange should happen and
//! with which secret. Pure function of request metadata and static config.

use hyper::header::{HeaderName, HOST, ORIGIN, REFERER};
use hyper::Request;
use std::fmt;
use tracing::debug;

use crate::config::BridgeConfig;
use crate::cookies;
use crate::policy::identity::{IdentityResolution, IdentitySecret};
use crate::policy::trust::TrustPolicy;

/// The parts of a request the gate looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// `Referer` header, or `Origin` when no referer was sent
    pub referer: Option<String>,
    /// `Host` header, or the URI authority for absolute-form requests
    pub host: Option<String>,
    /// Cookies in the order they appeared
    pub cookies: Vec<(String, String)>,
    /// Caller-asserted subject (multi-user mode only)
    pub subject: Option<String>,
}

impl RequestMeta {
    /// Extract metadata from a request. `subject_header` is `None` in
    /// single-user mode.
    pub fn from_request<B>(req: &Request<B>, subject_header: Option<&HeaderName>) -> Self {
        let headers = req.headers();
        let header_str = |name: &HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let referer = header_str(&REFERER).or_else(|| header_str(&ORIGIN));
        let host = header_str(&HOST).or_else(|| req.uri().authority().map(|a| a.to_string()));
        let subject = subject_header.and_then(header_str);

        Self {
            referer,
            host,
            cookies: cookies::request_cookies(headers),
            subject,
        }
    }

    /// True when a cookie called `name` with a non-empty value is present.
    pub fn has_session(&self, name: &str) -> bool {
        self.cookies.iter().any(|(n, v)| n == name && !v.is_empty())
    }
}

/// Outcome of the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Forward the request unchanged.
    Skip,
    /// Exchange this secret for a session.
    Exchange(IdentitySecret),
}

/// Why a request was not exchanged. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PolicyIncomplete,
    OriginMismatch,
    HostMismatch,
    SessionPresent,
    UnknownSubject,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PolicyIncomplete => write!(f, "policy_incomplete"),
            SkipReason::OriginMismatch => write!(f, "origin_mismatch"),
            SkipReason::HostMismatch => write!(f, "host_mismatch"),
            SkipReason::SessionPresent => write!(f, "session_present"),
            SkipReason::UnknownSubject => write!(f, "unknown_subject"),
        }
    }
}

/// Gate over borrowed configuration; cheap to build per request.
pub struct Gate<'a> {
    policy: &'a TrustPolicy,
    identities: &'a IdentityResolution,
    session_cookie: &'a str,
}

impl<'a> Gate<'a> {
    pub fn new(
        policy: &'a TrustPolicy,
        identities: &'a IdentityResolution,
        session_cookie: &'a str,
    ) -> Self {
        Self {
            policy,
            identities,
            session_cookie,
        }
    }

    pub fn from_config(config: &'a BridgeConfig) -> Self {
        Self::new(&config.policy, &config.identities, &config.cookie.name)
    }

    /// Decide whether to exchange. Never fails.
    pub fn evaluate(&self, meta: &RequestMeta) -> GateDecision {
        match self.check(meta) {
            Ok(secret) => GateDecision::Exchange(secret.clone()),
            Err(reason) => {
                debug!(
                    reason = %reason,
                    host = meta.host.as_deref().unwrap_or(""),
                    subject = meta.subject.as_deref().unwrap_or(""),
                    "Skipping token exchange"
                );
                GateDecision::Skip
            }
        }
    }

    /// All conditions must hold. The first failing one is reported.
    pub fn check(&self, meta: &RequestMeta) -> Result<&'a IdentitySecret, SkipReason> {
        if !self.policy.is_complete() {
            return Err(SkipReason::PolicyIncomplete);
        }
        if !self.policy.origin_matches(meta.referer.as_deref()) {
            return Err(SkipReason::OriginMismatch);
        }
        if !self.policy.host_matches(meta.host.as_deref()) {
            return Err(SkipReason::HostMismatch);
        }
        // Loop guard: a request already carrying the session is never re-exchanged
        if meta.has_session(self.session_cookie) {
            return Err(SkipReason::SessionPresent);
        }
        self.identities
            .resolve(meta.subject.as_deref())
            .ok_or(SkipReason::UnknownSubject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::identity::IdentityTable;

    const REFERER_OK: &str = "https://portal.example/auth/portal";
    const HOST_OK: &str = "ombi.example";

    fn policy() -> TrustPolicy {
        TrustPolicy::new(REFERER_OK, HOST_OK, "https://ombi.example")
    }

    fn fixed() -> IdentityResolution {
        IdentityResolution::Fixed(IdentitySecret::new("s3cret"))
    }

    fn table() -> IdentityResolution {
        IdentityResolution::table(
            IdentityTable::try_from_entries(vec![
                ("alice".to_string(), IdentitySecret::new("alice-token")),
                ("bob".to_string(), IdentitySecret::new("bob-token")),
            ])
            .unwrap(),
        )
    }

    fn approved_meta() -> RequestMeta {
        RequestMeta {
            referer: Some(REFERER_OK.to_string()),
            host: Some(HOST_OK.to_string()),
            cookies: vec![("theme".to_string(), "dark".to_string())],
            subject: Some("alice".to_string()),
        }
    }

    #[test]
    fn test_all_conditions_hold_fixed() {
        let (policy, ids) = (policy(), fixed());
        let gate = Gate::new(&policy, &ids, "Auth");
        assert_eq!(
            gate.evaluate(&approved_meta()),
            GateDecision::Exchange(IdentitySecret::new("s3cret"))
        );
    }

    #[test]
    fn test_all_conditions_hold_table() {
        let (policy, ids) = (policy(), table());
        let gate = Gate::new(&policy, &ids, "Auth");
        assert_eq!(
            gate.evaluate(&approved_meta()),
            GateDecision::Exchange(IdentitySecret::new("alice-token"))
        );
    }

    #[test]
    fn test_each_condition_flipped_skips() {
        let (policy, ids) = (policy(), table());
        let gate = Gate::new(&policy, &ids, "Auth");

        let mut meta = approved_meta();
        meta.referer = Some("https://elsewhere.example/".to_string());
        assert_eq!(gate.check(&meta), Err(SkipReason::OriginMismatch));
        assert_eq!(gate.evaluate(&meta), GateDecision::Skip);

        let mut meta = approved_meta();
        meta.host = Some("other.example".to_string());
        assert_eq!(gate.check(&meta), Err(SkipReason::HostMismatch));
        assert_eq!(gate.evaluate(&meta), GateDecision::Skip);

        let mut meta = approved_meta();
        meta.cookies.push(("Auth".to_string(), "existing".to_string()));
        assert_eq!(gate.check(&meta), Err(SkipReason::SessionPresent));
        assert_eq!(gate.evaluate(&meta), GateDecision::Skip);

        let mut meta = approved_meta();
        meta.subject = Some("mallory".to_string());
        assert_eq!(gate.check(&meta), Err(SkipReason::UnknownSubject));
        assert_eq!(gate.evaluate(&meta), GateDecision::Skip);
    }

    #[test]
    fn test_missing_inputs_skip() {
        let (policy, ids) = (policy(), table());
        let gate = Gate::new(&policy, &ids, "Auth");

        let mut meta = approved_meta();
        meta.referer = None;
        assert_eq!(gate.evaluate(&meta), GateDecision::Skip);

        let mut meta = approved_meta();
        meta.host = None;
        assert_eq!(gate.evaluate(&meta), GateDecision::Skip);

        let mut meta = approved_meta();
        meta.subject = None;
        assert_eq!(gate.check(&meta), Err(SkipReason::UnknownSubject));
    }

    #[test]
    fn test_scheme_and_case_differences_skip() {
        let (policy, ids) = (policy(), fixed());
        let gate = Gate::new(&policy, &ids, "Auth");

        let mut meta = approved_meta();
        meta.referer = Some("http://portal.example/auth/portal".to_string());
        assert_eq!(gate.evaluate(&meta), GateDecision::Skip);

        let mut meta = approved_meta();
        meta.host = Some("Ombi.Example".to_string());
        assert_eq!(gate.evaluate(&meta), GateDecision::Skip);
    }

    #[test]
    fn test_incomplete_policy_disables_exchange() {
        let ids = fixed();
        for policy in [
            TrustPolicy::new("", HOST_OK, "https://ombi.example"),
            TrustPolicy::new(REFERER_OK, "", "https://ombi.example"),
            TrustPolicy::new(REFERER_OK, HOST_OK, ""),
        ] {
            let gate = Gate::new(&policy, &ids, "Auth");
            assert_eq!(gate.check(&approved_meta()), Err(SkipReason::PolicyIncomplete));
        }
    }

    #[test]
    fn test_empty_session_cookie_does_not_count() {
        let (policy, ids) = (policy(), fixed());
        let gate = Gate::new(&policy, &ids, "Auth");

        let mut meta = approved_meta();
        meta.cookies.push(("Auth".to_string(), String::new()));
        assert!(matches!(gate.evaluate(&meta), GateDecision::Exchange(_)));

        // Cookie names are case-sensitive
        let mut meta = approved_meta();
        meta.cookies.push(("auth".to_string(), "x".to_string()));
        assert!(matches!(gate.evaluate(&meta), GateDecision::Exchange(_)));
    }

    #[test]
    fn test_repeated_delivery_with_session_never_exchanges() {
        let (policy, ids) = (policy(), fixed());
        let gate = Gate::new(&policy, &ids, "Auth");
        let mut meta = approved_meta();
        meta.cookies.push(("Auth".to_string(), "tok-xyz".to_string()));

        for _ in 0..5 {
            assert_eq!(gate.evaluate(&meta), GateDecision::Skip);
        }
    }

    #[test]
    fn test_meta_from_request() {
        let subject = HeaderName::from_static("x-token-subject");
        let req = Request::builder()
            .uri("/movies")
            .header(HOST, HOST_OK)
            .header(REFERER, REFERER_OK)
            .header("x-token-subject", "bob")
            .header("cookie", "a=1; Auth=tok")
            .body(())
            .unwrap();

        let meta = RequestMeta::from_request(&req, Some(&subject));
        assert_eq!(meta.referer.as_deref(), Some(REFERER_OK));
        assert_eq!(meta.host.as_deref(), Some(HOST_OK));
        assert_eq!(meta.subject.as_deref(), Some("bob"));
        assert!(meta.has_session("Auth"));

        // Subject header is ignored in single-user mode
        let meta = RequestMeta::from_request(&req, None);
        assert_eq!(meta.subject, None);
    }

    #[test]
    fn test_meta_falls_back_to_origin_and_authority() {
        let req = Request::builder()
            .uri("https://ombi.example/movies")
            .header(ORIGIN, "https://portal.example")
            .body(())
            .unwrap();

        let meta = RequestMeta::from_request(&req, None);
        assert_eq!(meta.referer.as_deref(), Some("https://portal.example"));
        assert_eq!(meta.host.as_deref(), Some("ombi.example"));
        assert!(meta.cookies.is_empty());
    }
}
