//! Removal of frame-blocking response headers.
//!
//! Proxied pages are rendered inside an embedding frame, and browsers refuse
//! to do that when the origin sends either of these headers.

use std::collections::BTreeMap;

/// Header names dropped from every upstream response.
pub const FRAME_BLOCKING_HEADERS: &[&str] = &["content-security-policy", "x-frame-options"];

/// Whether `name` is one of [`FRAME_BLOCKING_HEADERS`], in any casing.
pub fn is_frame_blocking(name: &str) -> bool {
    FRAME_BLOCKING_HEADERS
        .iter()
        .any(|blocked| blocked.eq_ignore_ascii_case(name))
}

/// Copy `headers` into a lower-cased map without frame-blocking headers.
///
/// Repeated names are joined with `", "`. Values are not altered.
pub fn sanitize_headers<'a, I>(headers: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut sanitized: BTreeMap<String, String> = BTreeMap::new();

    for (name, value) in headers {
        if is_frame_blocking(name) {
            continue;
        }

        sanitized
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    sanitized
}

/// Sanitize a reqwest header map. Values that are not visible ASCII are skipped.
pub fn sanitize_header_map(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    sanitize_headers(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

    #[test]
    fn test_strips_blocked_headers_any_case() {
        let input = [
            ("Content-Security-Policy", "default-src 'none'"),
            ("CONTENT-SECURITY-POLICY", "frame-ancestors 'none'"),
            ("x-frame-options", "DENY"),
            ("X-Frame-Options", "SAMEORIGIN"),
            ("Content-Type", "text/html"),
        ];

        let out = sanitize_headers(input);

        assert_eq!(out.len(), 1);
        assert_eq!(out.get("content-type").map(String::as_str), Some("text/html"));
    }

    #[test]
    fn test_other_headers_untouched() {
        let input = [
            ("Cache-Control", "max-age=60"),
            ("Content-Security-Policy-Report-Only", "default-src 'self'"),
            ("X-Custom", "  spaced value "),
        ];

        let out = sanitize_headers(input);

        assert_eq!(out.get("cache-control").map(String::as_str), Some("max-age=60"));
        assert_eq!(
            out.get("content-security-policy-report-only").map(String::as_str),
            Some("default-src 'self'")
        );
        assert_eq!(out.get("x-custom").map(String::as_str), Some("  spaced value "));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let input = [
            ("Content-Type", "text/html"),
            ("X-Frame-Options", "DENY"),
            ("Vary", "Accept"),
            ("vary", "Origin"),
        ];

        let once = sanitize_headers(input);
        let twice = sanitize_headers(once.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        assert_eq!(once, twice);
        assert_eq!(once.get("vary").map(String::as_str), Some("Accept, Origin"));
    }

    #[test]
    fn test_sanitize_header_map() {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-frame-options"), HeaderValue::from_static("DENY"));
        headers.insert(HeaderName::from_static("content-security-policy"), HeaderValue::from_static("default-src 'none'"));
        headers.insert(HeaderName::from_static("content-type"), HeaderValue::from_static("image/png"));

        let out = sanitize_header_map(&headers);

        assert_eq!(out.len(), 1);
        assert!(out.contains_key("content-type"));
    }
}
