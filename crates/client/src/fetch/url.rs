//! Target URL validation before an upstream request is issued.

/// Error type for target URL failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Turn a raw `url` query value into an absolute http(s) URL.
///
/// 1. Trim leading/trailing whitespace
/// 2. Treat `//host/...` as `https://host/...`
/// 3. Default scheme to https:// if missing
/// 4. Reject anything that is not http or https
/// 5. Drop the fragment, which is never sent upstream
pub fn canonicalize_target(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{rest}")
    } else if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_absolute() {
        let url = canonicalize_target("https://example.com/page?q=1").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page?q=1");
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize_target("example.com/about").unwrap();
        assert_eq!(url.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_canonicalize_protocol_relative() {
        let url = canonicalize_target("//cdn.example.net/lib.js").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.net/lib.js");
    }

    #[test]
    fn test_canonicalize_lowercases_host() {
        let url = canonicalize_target("http://EXAMPLE.COM").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_drops_fragment() {
        let url = canonicalize_target("https://example.com/a#top").unwrap();
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_canonicalize_trim_whitespace() {
        let url = canonicalize_target("  https://example.com  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        assert!(matches!(canonicalize_target("file:///etc/passwd"), Err(UrlError::UnsupportedScheme(_))));
        assert!(matches!(canonicalize_target("ftp://example.com/x"), Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize_target(""), Err(UrlError::Empty)));
        assert!(matches!(canonicalize_target("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_canonicalize_invalid() {
        assert!(matches!(canonicalize_target("http://[::1"), Err(UrlError::InvalidUrl(_))));
    }
}
