//! Proxy-path URL scheme.
//!
//! Every rewritten reference has the form
//! `<proxy-path>?url=<percent-encoded absolute url>`. Previously cached
//! documents and bookmarked links depend on this shape staying stable.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

/// Characters left unescaped, matching JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode `value` as a single URI component.
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Build the proxied form of an absolute `target`.
pub fn proxy_url(proxy_path: &str, target: &str) -> String {
    format!("{proxy_path}?url={}", encode_uri_component(target))
}

/// Resolve `reference` against `base`.
///
/// Absolute references come back normalized; relative and protocol-relative
/// ones are joined onto `base`. When `base` is missing or the join fails the
/// literal `reference` is returned unchanged.
pub fn resolve_reference(base: Option<&Url>, reference: &str) -> String {
    match base.map(|b| b.join(reference)) {
        Some(Ok(resolved)) => resolved.to_string(),
        _ => reference.to_string(),
    }
}
