//! Installing an issued credential
//!
//! One strategy per deployment:
//! - **redirect**: answer 302 to the landing page with `Set-Cookie`
//! - **inline**: set the cookie on the request before it reaches the next handler

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CACHE_CONTROL, LOCATION, SET_COOKIE};
use hyper::{Request, Response, StatusCode};
use std::fmt;

use crate::cookies;
use crate::exchange::SessionCredential;
use crate::types::Result;

/// How the bridge hands the issued cookie to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InstallationStrategy {
    /// 302 to the landing page with `Set-Cookie`; the next handler still runs
    Redirect,
    /// Cookie attached to the continuing request; no redirect
    Inline,
}

impl fmt::Display for InstallationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallationStrategy::Redirect => write!(f, "redirect"),
            InstallationStrategy::Inline => write!(f, "inline"),
        }
    }
}

/// 302 Found to `landing_url` carrying the credential.
pub fn redirect_response(
    credential: &SessionCredential,
    landing_url: &str,
) -> Result<Response<Full<Bytes>>> {
    let location = HeaderValue::from_str(landing_url)?;
    let set_cookie = HeaderValue::from_str(&credential.to_set_cookie())?;

    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::FOUND;
    let headers = response.headers_mut();
    headers.insert(LOCATION, location);
    headers.insert(SET_COOKIE, set_cookie);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}

/// Put the credential in the request's `Cookie` header, replacing any
/// existing cookie of the same name.
pub fn attach_to_request<B>(req: &mut Request<B>, credential: &SessionCredential) -> Result<()> {
    cookies::replace_cookie(req.headers_mut(), &credential.name, &credential.value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hyper::header::COOKIE;

    fn credential() -> SessionCredential {
        SessionCredential::issue("Auth", "tok-xyz", "example", Utc::now())
    }

    #[test]
    fn test_redirect_response() {
        let response =
            redirect_response(&credential(), "https://ombi.example/auth/cookie").unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "https://ombi.example/auth/cookie");
        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("Auth=tok-xyz; Domain=example; Path=/;"));
        assert!(set_cookie.ends_with("SameSite=Lax; Secure"));
        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
    }

    #[test]
    fn test_redirect_rejects_unencodable_landing_url() {
        assert!(redirect_response(&credential(), "https://bad\nurl").is_err());
    }

    #[test]
    fn test_attach_to_request() {
        let mut req = Request::builder()
            .header(COOKIE, "sid=1")
            .body(())
            .unwrap();
        attach_to_request(&mut req, &credential()).unwrap();
        assert_eq!(req.headers()[COOKIE], "sid=1; Auth=tok-xyz");
    }

    #[test]
    fn test_attach_replaces_empty_session_cookie() {
        let mut req = Request::builder()
            .header(COOKIE, "Auth=; theme=dark")
            .body(())
            .unwrap();
        attach_to_request(&mut req, &credential()).unwrap();
        assert_eq!(req.headers()[COOKIE], "theme=dark; Auth=tok-xyz");
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(InstallationStrategy::Redirect.to_string(), "redirect");
        assert_eq!(InstallationStrategy::Inline.to_string(), "inline");
    }
}
