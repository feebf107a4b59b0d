//! Upstream fetch pipeline.
//!
//! ### Request
//! - Single GET with a fixed header set (user agent, `accept: */*`,
//!   `accept-language`, gzip/brotli/deflate negotiation)
//! - No cookies, no request body
//! - Timeout and body size limit from [`FetchConfig`]
//!
//! ### Response branches
//! - 3xx with `location`: a refresh document pointing at the raw location
//! - `text/html`: links rewritten through the proxy path
//! - anything else: body base64-encoded, flagged with
//!   `content-transfer-encoding: base64`
//!
//! Frame-blocking headers are stripped in every branch.

pub mod url;

use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response};

use reflux_core::{AppConfig, Artifact, Error, RedirectPolicy, TRANSFER_ENCODING_HEADER};

use crate::body::encode_binary;
use crate::classify::{ResponseKind, classify};
use crate::retry::RetryPolicy;
use crate::rewrite::LinkRewriter;
use crate::sanitize::sanitize_header_map;

pub use url::{UrlError, canonicalize_target};

/// Content type of every document the pipeline produces from text.
pub const HTML_UTF8: &str = "text/html; charset=utf-8";

/// Fallback content type for binary bodies that arrive without one.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Configuration for the fetch pipeline.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "reflux/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Whether the transport follows redirects (default: follow)
    pub redirect_policy: RedirectPolicy,

    /// Maximum number of redirects to follow (default: 10). The 3xx that
    /// would exceed it is returned as-is and becomes a refresh document.
    pub max_redirects: usize,

    /// Route prefix rewritten references point at (default: "/proxy")
    pub proxy_path: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            redirect_policy: config.redirect_policy,
            max_redirects: config.max_redirects,
            proxy_path: config.proxy_path.clone(),
        }
    }
}

/// Fetches one target and turns the response into an [`Artifact`].
pub struct FetchPipeline {
    http: Client,
    config: FetchConfig,
    rewriter: LinkRewriter,
}

impl FetchPipeline {
    /// Create a pipeline with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let redirect = match config.redirect_policy {
            RedirectPolicy::Follow => {
                let max_redirects = config.max_redirects;
                reqwest::redirect::Policy::custom(move |attempt| {
                    if attempt.previous().len() > max_redirects { attempt.stop() } else { attempt.follow() }
                })
            }
            RedirectPolicy::Surface => reqwest::redirect::Policy::none(),
        };

        let mut default_headers = HeaderMap::new();
        default_headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        default_headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(redirect)
            .default_headers(default_headers)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        let rewriter = LinkRewriter::new(config.proxy_path.clone());

        Ok(Self { http, config, rewriter })
    }

    /// Fetch `target` and produce the artifact served to clients.
    ///
    /// Upstream 4xx/5xx responses are content like any other and do not fail.
    pub async fn fetch(&self, target: &str) -> Result<Artifact, Error> {
        let start = Instant::now();
        let url = canonicalize_target(target).map_err(|e| match e {
            UrlError::Empty => Error::InvalidInput("Missing URL".to_string()),
            other => Error::InvalidUrl(other.to_string()),
        })?;

        let response = self.http.get(url.as_str()).send().await.map_err(transport_error)?;

        let status = response.status().as_u16();
        let mut headers = sanitize_header_map(response.headers());
        let location = headers.get("location").cloned();
        let kind = classify(status, headers.get("content-type").map(String::as_str), location.is_some());

        self.check_declared_length(&response)?;

        let body = match (kind, location) {
            (ResponseKind::Redirect, Some(location)) => {
                headers.insert("content-type".to_string(), HTML_UTF8.to_string());
                redirect_document(&location)
            }
            (ResponseKind::Markup, _) => {
                let text = response.text().await.map_err(transport_error)?;
                self.check_length(text.len())?;
                headers.insert("content-type".to_string(), HTML_UTF8.to_string());
                self.rewriter.rewrite(&text, url.as_str())
            }
            _ => {
                let bytes = response.bytes().await.map_err(transport_error)?;
                self.check_length(bytes.len())?;
                headers
                    .entry("content-type".to_string())
                    .or_insert_with(|| OCTET_STREAM.to_string());
                headers.insert(TRANSFER_ENCODING_HEADER.to_string(), "base64".to_string());
                encode_binary(&bytes)
            }
        };

        tracing::info!(
            url = %url,
            status,
            kind = ?kind,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched upstream"
        );

        Ok(Artifact::new(body, headers))
    }

    /// [`fetch`](Self::fetch) under `policy`, retrying transient failures.
    pub async fn fetch_with_retry(&self, target: &str, policy: &RetryPolicy) -> Result<Artifact, Error> {
        policy.run(|| self.fetch(target)).await
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn check_declared_length(&self, response: &Response) -> Result<(), Error> {
        match response.content_length() {
            Some(len) if len > self.config.max_bytes as u64 => Err(too_large(len as usize, self.config.max_bytes)),
            _ => Ok(()),
        }
    }

    fn check_length(&self, len: usize) -> Result<(), Error> {
        if len > self.config.max_bytes { Err(too_large(len, self.config.max_bytes)) } else { Ok(()) }
    }
}

fn too_large(len: usize, max: usize) -> Error {
    Error::FetchTooLarge(format!("{} bytes exceeds {}", len, max))
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::FetchTimeout(e.to_string())
    } else {
        Error::HttpError(format!("network error: {}", e))
    }
}

/// Minimal document that sends the client on to `location`.
pub fn redirect_document(location: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta http-equiv=\"refresh\" content=\"0;url={}\"></head><body></body></html>",
        escape_attribute(location)
    )
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
