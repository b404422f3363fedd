//! Cookie header helpers
//!
//! Reads the `Cookie` request headers into ordered name/value pairs, writes
//! them back for forwarding, and sets a single cookie on a request.

use hyper::header::{HeaderValue, InvalidHeaderValue, COOKIE};
use hyper::HeaderMap;

/// Parse every `Cookie` header on a request, preserving order.
///
/// Pairs without `=` or with an empty name are dropped. Surrounding double
/// quotes on a value are stripped.
pub fn request_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(parse_cookie_header)
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Split one `Cookie` header value into name/value pairs.
pub fn parse_cookie_header(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|part| {
        let (name, value) = part.trim().split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some((name, value))
    })
}

/// Join pairs into one `Cookie` header value. `None` when there are no pairs.
pub fn format_cookie_header(pairs: &[(String, String)]) -> Option<String> {
    if pairs.is_empty() {
        return None;
    }
    let joined = pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ");
    Some(joined)
}

/// Set `name=value` on the request's cookies, dropping any earlier pair with
/// the same name so downstream handlers cannot pick up a stale value.
///
/// Multiple `Cookie` headers are folded into one so downstream handlers see a
/// single header, as HTTP/1.1 requires. Other segments are kept verbatim.
pub fn replace_cookie(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
) -> Result<(), InvalidHeaderValue> {
    let mut segments = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter(|segment| {
            segment
                .split_once('=')
                .map_or(true, |(existing, _)| existing.trim() != name)
        })
        .map(str::to_string)
        .collect::<Vec<_>>();
    segments.push(format!("{}={}", name, value));

    let value = HeaderValue::from_str(&segments.join("; "))?;
    headers.insert(COOKIE, value);
    Ok(())
}

/// True when `c` is allowed in a cookie value (RFC 6265 `cookie-octet`).
pub fn is_cookie_octet(c: char) -> bool {
    matches!(c, '\x21' | '\x23'..='\x2B' | '\x2D'..='\x3A' | '\x3C'..='\x5B' | '\x5D'..='\x7E')
}

/// True when `name` is a valid cookie name (an HTTP token).
pub fn is_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_cookies_preserve_order_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1; b=2"));
        headers.append(COOKIE, HeaderValue::from_static("c=3"));

        let cookies = request_cookies(&headers);
        assert_eq!(
            cookies,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_drops_malformed_pairs() {
        let pairs: Vec<_> =
            parse_cookie_header("flag; =orphan; ok=yes; quoted=\"v\"; empty=").collect();
        assert_eq!(pairs, vec![("ok", "yes"), ("quoted", "v"), ("empty", "")]);
    }

    #[test]
    fn test_format_cookie_header() {
        assert_eq!(format_cookie_header(&[]), None);
        let pairs = vec![
            ("sid".to_string(), "x".to_string()),
            ("theme".to_string(), "dark".to_string()),
        ];
        assert_eq!(
            format_cookie_header(&pairs).as_deref(),
            Some("sid=x; theme=dark")
        );
    }

    #[test]
    fn test_replace_cookie_merges_existing_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("b=2"));

        replace_cookie(&mut headers, "Auth", "tok").unwrap();

        assert_eq!(headers.get_all(COOKIE).iter().count(), 1);
        assert_eq!(headers[COOKIE], "a=1; b=2; Auth=tok");
    }

    #[test]
    fn test_replace_cookie_on_empty_request() {
        let mut headers = HeaderMap::new();
        replace_cookie(&mut headers, "Auth", "tok").unwrap();
        assert_eq!(headers[COOKIE], "Auth=tok");
    }

    #[test]
    fn test_replace_cookie_drops_stale_pairs() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("Auth=; theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("flag; Auth = old; Authorization=x"));

        replace_cookie(&mut headers, "Auth", "tok").unwrap();

        assert_eq!(headers[COOKIE], "theme=dark; flag; Authorization=x; Auth=tok");
        let auth: Vec<_> = request_cookies(&headers)
            .into_iter()
            .filter(|(name, _)| name == "Auth")
            .collect();
        assert_eq!(auth, vec![("Auth".to_string(), "tok".to_string())]);
    }

    #[test]
    fn test_cookie_character_classes() {
        assert!(is_cookie_octet('a'));
        assert!(!is_cookie_octet(';'));
        assert!(!is_cookie_octet(' '));
        assert!(!is_cookie_octet('"'));
        assert!(is_cookie_name("Auth"));
        assert!(!is_cookie_name("Au th"));
        assert!(!is_cookie_name(""));
    }
}
