//! Response classification.
//!
//! Every upstream response takes exactly one of three output branches.

/// Output branch chosen for an upstream response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// 3xx with a `location` header; becomes a client-side refresh document.
    Redirect,
    /// `text/html` content; rewritten so its links re-enter the proxy.
    Markup,
    /// Anything else; passed through as base64.
    Binary,
}

/// True for `300 <= status < 400`.
pub fn is_redirect(status: u16) -> bool {
    (300..400).contains(&status)
}

/// True if the content-type value contains `text/html` (case-sensitive).
pub fn is_markup(content_type: &str) -> bool {
    content_type.contains("text/html")
}

/// Pick the output branch for a response.
///
/// A 3xx without a `location` has nowhere to send the client, so it is
/// classified by its content type instead.
pub fn classify(status: u16, content_type: Option<&str>, has_location: bool) -> ResponseKind {
    if is_redirect(status) && has_location {
        ResponseKind::Redirect
    } else if content_type.is_some_and(is_markup) {
        ResponseKind::Markup
    } else {
        ResponseKind::Binary
    }
}
