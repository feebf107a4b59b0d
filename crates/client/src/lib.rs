//! Client code for reflux.
//!
//! This crate provides the upstream fetch pipeline and the pieces it is built
//! from: response classification, header sanitizing, link rewriting, and
//! retry. The server wires them to the cache and the HTTP surface.

pub mod body;
pub mod classify;
pub mod fetch;
pub mod retry;
pub mod rewrite;
pub mod sanitize;

pub use body::{artifact_bytes, encode_binary};
pub use classify::{ResponseKind, classify, is_markup, is_redirect};
pub use fetch::{FetchConfig, FetchPipeline, UrlError, canonicalize_target};
pub use retry::RetryPolicy;
pub use rewrite::{INJECTED_BLOCK, LinkRewriter, MarkupBackend, RewriteError, proxy_url};
pub use sanitize::{FRAME_BLOCKING_HEADERS, sanitize_header_map, sanitize_headers};
