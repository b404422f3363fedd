//! Static trust policy
//!
//! Which referer and which target host may trigger a silent exchange, and
//! where the secondary service lives. Built once at startup, never mutated.

/// Path of the secondary service's token-exchange endpoint.
pub const EXCHANGE_PATH: &str = "/api/v1/token/plextoken";

/// Trust policy for the gate.
///
/// An empty field disables exchange entirely: the gate only approves when all
/// three values are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustPolicy {
    allowed_origin: String,
    allowed_target_host: String,
    service_url: String,
}

impl TrustPolicy {
    pub fn new(
        allowed_origin: impl Into<String>,
        allowed_target_host: impl Into<String>,
        service_url: impl Into<String>,
    ) -> Self {
        Self {
            allowed_origin: allowed_origin.into(),
            allowed_target_host: allowed_target_host.into(),
            service_url: service_url.into(),
        }
    }

    pub fn allowed_origin(&self) -> &str {
        &self.allowed_origin
    }

    pub fn allowed_target_host(&self) -> &str {
        &self.allowed_target_host
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// True when every field is set.
    pub fn is_complete(&self) -> bool {
        !self.allowed_origin.is_empty()
            && !self.allowed_target_host.is_empty()
            && !self.service_url.is_empty()
    }

    /// Exact byte comparison against the allowed referer/origin.
    pub fn origin_matches(&self, origin: Option<&str>) -> bool {
        !self.allowed_origin.is_empty() && origin == Some(self.allowed_origin.as_str())
    }

    /// Exact byte comparison against the allowed target host.
    pub fn host_matches(&self, host: Option<&str>) -> bool {
        !self.allowed_target_host.is_empty() && host == Some(self.allowed_target_host.as_str())
    }

    /// Full URL of the token-exchange endpoint.
    pub fn exchange_endpoint(&self) -> String {
        format!("{}{}", self.service_url.trim_end_matches('/'), EXCHANGE_PATH)
    }

    /// Cookie domain derived from the allowed host.
    pub fn default_cookie_domain(&self) -> String {
        parent_domain(&self.allowed_target_host)
    }

    /// Landing page the redirect strategy sends the browser to.
    pub fn default_landing_url(&self) -> String {
        if self.allowed_target_host.is_empty() {
            return String::new();
        }
        format!("https://{}/auth/cookie", self.allowed_target_host)
    }
}

/// Drop the port and the leftmost label of a host.
///
/// `ombi.example` becomes `example`, `ombi.lab.example.net:443` becomes
/// `lab.example.net`. A single-label host is returned unchanged.
pub fn parent_domain(host: &str) -> String {
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    match host.split_once('.') {
        Some((_, rest)) if !rest.is_empty() => rest.to_string(),
        _ => host.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_policy_is_detected() {
        assert!(TrustPolicy::new("https://a/", "b", "https://c").is_complete());
        assert!(!TrustPolicy::new("", "b", "https://c").is_complete());
        assert!(!TrustPolicy::new("https://a/", "", "https://c").is_complete());
        assert!(!TrustPolicy::new("https://a/", "b", "").is_complete());
        assert!(!TrustPolicy::default().is_complete());
    }

    #[test]
    fn test_matching_is_exact() {
        let policy = TrustPolicy::new(
            "https://portal.example/auth/portal",
            "ombi.example",
            "https://ombi.example",
        );

        assert!(policy.origin_matches(Some("https://portal.example/auth/portal")));
        assert!(!policy.origin_matches(Some("http://portal.example/auth/portal")));
        assert!(!policy.origin_matches(Some("https://portal.example/auth/portal/")));
        assert!(!policy.origin_matches(Some("HTTPS://portal.example/auth/portal")));
        assert!(!policy.origin_matches(None));

        assert!(policy.host_matches(Some("ombi.example")));
        assert!(!policy.host_matches(Some("OMBI.example")));
        assert!(!policy.host_matches(Some("ombi.example:8443")));
        assert!(!policy.host_matches(Some("evil-ombi.example")));
    }

    #[test]
    fn test_empty_policy_never_matches_empty_input() {
        let policy = TrustPolicy::default();
        assert!(!policy.origin_matches(Some("")));
        assert!(!policy.host_matches(Some("")));
    }

    #[test]
    fn test_exchange_endpoint_joins_without_double_slash() {
        let policy = TrustPolicy::new("r", "h", "https://ombi.example/");
        assert_eq!(
            policy.exchange_endpoint(),
            "https://ombi.example/api/v1/token/plextoken"
        );
    }

    #[test]
    fn test_parent_domain() {
        assert_eq!(parent_domain("ombi.example"), "example");
        assert_eq!(parent_domain("ombi.lab.example.net"), "lab.example.net");
        assert_eq!(parent_domain("ombi.example:443"), "example");
        assert_eq!(parent_domain("localhost"), "localhost");
    }

    #[test]
    fn test_default_landing_url() {
        let policy = TrustPolicy::new("r", "ombi.example", "s");
        assert_eq!(policy.default_landing_url(), "https://ombi.example/auth/cookie");
        assert_eq!(TrustPolicy::default().default_landing_url(), "");
    }
}
