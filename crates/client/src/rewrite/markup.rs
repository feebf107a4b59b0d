//! Markup capability consumed by the link rewriter.
//!
//! The rewriter only needs to visit selected elements, read and write their
//! attributes, and insert static markup. [`MarkupBackend`] is that seam; the
//! production implementation streams through `lol_html`, which leaves every
//! byte it does not touch exactly as it arrived.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lol_html::html_content::{ContentType, Element, EndTag};
use lol_html::{RewriteStrSettings, element, rewrite_str};

/// Errors raised while transforming markup.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("invalid attribute name: {0}")]
    Attribute(String),

    #[error("markup transform failed: {0}")]
    Transform(String),
}

/// A single element exposed to the rewrite rules.
pub trait MarkupElement {
    /// Lower-cased tag name.
    fn tag_name(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), RewriteError>;

    /// Insert raw markup just before the element's end tag once it is
    /// reached, unless `done` is already set by then. Sets `done` when the
    /// markup is written. Elements without an end tag never write it.
    fn append_once(&mut self, html: &'static str, done: Rc<Cell<bool>>);

    /// Insert raw markup immediately before the element.
    fn insert_before_html(&mut self, html: &str);
}

/// Callback run on each selected element.
pub type ElementVisitor<'v> = dyn FnMut(&mut dyn MarkupElement) -> Result<(), RewriteError> + 'v;

/// Parse, visit, and serialize a document in one pass.
pub trait MarkupBackend: Send + Sync {
    /// Run `visitor` on every element matching any of `selectors` (in document
    /// order) and return the serialized result.
    fn transform(&self, markup: &str, selectors: &[&str], visitor: &mut ElementVisitor<'_>) -> Result<String, RewriteError>;
}

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Streaming backend built on `lol_html`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LolHtmlBackend;

struct LolElement<'a, 'r, 't> {
    inner: &'a mut Element<'r, 't>,
}

impl MarkupElement for LolElement<'_, '_, '_> {
    fn tag_name(&self) -> String {
        self.inner.tag_name()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.inner.get_attribute(name)
    }

    fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), RewriteError> {
        self.inner
            .set_attribute(name, value)
            .map_err(|e| RewriteError::Attribute(e.to_string()))
    }

    fn append_once(&mut self, html: &'static str, done: Rc<Cell<bool>>) {
        if let Some(handlers) = self.inner.end_tag_handlers() {
            handlers.push(Box::new(move |end: &mut EndTag<'_>| -> HandlerResult {
                if !done.get() {
                    end.before(html, ContentType::Html);
                    done.set(true);
                }
                Ok(())
            }));
        }
    }

    fn insert_before_html(&mut self, html: &str) {
        self.inner.before(html, ContentType::Html);
    }
}

impl MarkupBackend for LolHtmlBackend {
    fn transform(&self, markup: &str, selectors: &[&str], visitor: &mut ElementVisitor<'_>) -> Result<String, RewriteError> {
        let visitor = RefCell::new(visitor);

        let element_content_handlers = selectors
            .iter()
            .map(|&selector| {
                element!(selector, |el| {
                    let mut adapter = LolElement { inner: el };
                    let mut visit = visitor.borrow_mut();
                    (*visit)(&mut adapter)?;
                    Ok(())
                })
            })
            .collect();

        rewrite_str(
            markup,
            RewriteStrSettings { element_content_handlers, strict: false, ..RewriteStrSettings::new() },
        )
        .map_err(|e| RewriteError::Transform(e.to_string()))
    }
}
