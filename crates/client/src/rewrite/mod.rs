//! Link rewriting so proxied documents stay inside the proxy.
//!
//! ### Rewritten references
//! - `a[href]`, `form[action]`, `script[src]`, `iframe[src]`, `img[src]`
//! - `meta http-equiv=refresh` targets (`content="N;url=..."`)
//!
//! Each reference is resolved against the document URL and replaced with
//! `<proxy-path>?url=<encoded>`. A reference that cannot be resolved is still
//! routed through the proxy in its literal form.
//!
//! ### Injected block
//! A fixed style/script block is written just before `</head>`. When `<body>`
//! opens without a `</head>` first, it goes before `<body>` instead, and at the
//! end of the output when the document has neither.
//!
//! Rewriting never fails outward: on any error the original markup is served.

pub mod markup;
pub mod proxy_url;

use std::cell::Cell;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

pub use markup::{LolHtmlBackend, MarkupBackend, MarkupElement, RewriteError};
pub use proxy_url::{encode_uri_component, proxy_url, resolve_reference};

/// Element/attribute pairs whose values are routed through the proxy.
pub const REWRITE_TABLE: &[(&str, &str)] =
    &[("a", "href"), ("form", "action"), ("script", "src"), ("iframe", "src"), ("img", "src")];

/// Static block appended to every rewritten document head.
pub const INJECTED_BLOCK: &str = "<style>body { font-family: sans-serif; } iframe { border: none; }</style>\
<script>window.__REFLUX_SANDBOX__ = true;</script>";

const SELECTORS: &[&str] =
    &["a[href]", "form[action]", "script[src]", "iframe[src]", "img[src]", "meta[http-equiv]", "head", "body"];

static META_REFRESH_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)url=(.+)").expect("valid meta refresh regex"));

/// Rewrites outbound references in HTML documents.
#[derive(Debug, Clone)]
pub struct LinkRewriter<B = LolHtmlBackend> {
    proxy_path: String,
    backend: B,
}

impl LinkRewriter<LolHtmlBackend> {
    /// Create a rewriter pointing references at `proxy_path`.
    pub fn new(proxy_path: impl Into<String>) -> Self {
        Self::with_backend(proxy_path, LolHtmlBackend)
    }
}

impl<B: MarkupBackend> LinkRewriter<B> {
    pub fn with_backend(proxy_path: impl Into<String>, backend: B) -> Self {
        Self { proxy_path: proxy_path.into(), backend }
    }

    pub fn proxy_path(&self) -> &str {
        &self.proxy_path
    }

    /// Rewrite `markup` fetched from `base_url`.
    ///
    /// Returns the original markup unchanged if the document cannot be
    /// transformed.
    pub fn rewrite(&self, markup: &str, base_url: &str) -> String {
        match self.try_rewrite(markup, base_url) {
            Ok(rewritten) => {
                tracing::debug!(base_url, "markup rewritten");
                rewritten
            }
            Err(e) => {
                tracing::warn!(base_url, error = %e, "failed to rewrite markup, serving original");
                markup.to_string()
            }
        }
    }

    fn try_rewrite(&self, markup: &str, base_url: &str) -> Result<String, RewriteError> {
        let base = Url::parse(base_url).ok();
        let injected = Rc::new(Cell::new(false));

        let mut output = self.backend.transform(markup, SELECTORS, &mut |el| {
            let tag = el.tag_name();
            match tag.as_str() {
                "meta" => self.rewrite_meta_refresh(el, base.as_ref()),
                "head" => {
                    if !injected.get() {
                        el.append_once(INJECTED_BLOCK, Rc::clone(&injected));
                    }
                    Ok(())
                }
                // Reached with the flag unset only when no `</head>` came first.
                "body" => {
                    if !injected.get() {
                        el.insert_before_html(INJECTED_BLOCK);
                        injected.set(true);
                    }
                    Ok(())
                }
                _ => match REWRITE_TABLE.iter().find(|(name, _)| *name == tag) {
                    Some((_, attr)) => self.rewrite_attribute(el, attr, base.as_ref()),
                    None => Ok(()),
                },
            }
        })?;

        if !injected.get() {
            output.push_str(INJECTED_BLOCK);
        }

        Ok(output)
    }

    fn proxied(&self, base: Option<&Url>, reference: &str) -> String {
        let reference = decode_attribute_entities(reference);
        let resolved = resolve_reference(base, &reference);
        proxy_url(&self.proxy_path, &resolved)
    }

    fn rewrite_attribute(&self, el: &mut dyn MarkupElement, attr: &str, base: Option<&Url>) -> Result<(), RewriteError> {
        let Some(original) = el.attribute(attr) else {
            return Ok(());
        };
        if original.is_empty() {
            return Ok(());
        }

        let proxied = self.proxied(base, &original);
        el.set_attribute(attr, &proxied)
    }

    fn rewrite_meta_refresh(&self, el: &mut dyn MarkupElement, base: Option<&Url>) -> Result<(), RewriteError> {
        let is_refresh = el
            .attribute("http-equiv")
            .is_some_and(|v| v.eq_ignore_ascii_case("refresh"));
        if !is_refresh {
            return Ok(());
        }

        let Some(content) = el.attribute("content") else {
            return Ok(());
        };
        let Some(target) = META_REFRESH_URL.captures(&content).and_then(|c| c.get(1)) else {
            return Ok(());
        };

        let proxied = self.proxied(base, target.as_str());
        el.set_attribute("content", &format!("0;url={proxied}"))
    }
}

/// Undo the HTML escaping an attribute value may carry in source form.
///
/// Named, decimal and hexadecimal character references are all decoded.
fn decode_attribute_entities(value: &str) -> String {
    html_escape::decode_html_entities(value).into_owned()
}

#[cfg(test)]
mod fake;
