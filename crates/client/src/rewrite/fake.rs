//! In-memory markup backend for exercising rewrite rules without a parser.
//!
//! End tags are treated as reached as soon as an element is visited.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Mutex;

use super::markup::{ElementVisitor, MarkupBackend, MarkupElement, RewriteError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub appended: Vec<String>,
    pub before: Vec<String>,
}

impl FakeElement {
    pub fn new(tag: &str, attrs: &[(&str, &str)]) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            appended: Vec::new(),
            before: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn matches(&self, selector: &str) -> bool {
        match selector.split_once('[') {
            Some((tag, rest)) => tag == self.tag && self.attr(rest.trim_end_matches(']')).is_some(),
            None => selector == self.tag,
        }
    }

    fn serialize(&self) -> String {
        let attrs: String = self.attrs.iter().map(|(k, v)| format!(" {k}=\"{v}\"")).collect();
        format!("{}<{}{}>{}</{}>", self.before.concat(), self.tag, attrs, self.appended.concat(), self.tag)
    }
}

impl MarkupElement for FakeElement {
    fn tag_name(&self) -> String {
        self.tag.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attr(name).map(str::to_string)
    }

    fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), RewriteError> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(RewriteError::Attribute(name.to_string()));
        }
        match self.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn append_once(&mut self, html: &'static str, done: Rc<Cell<bool>>) {
        if !done.get() {
            self.appended.push(html.to_string());
            done.set(true);
        }
    }

    fn insert_before_html(&mut self, html: &str) {
        self.before.push(html.to_string());
    }
}

/// Backend that ignores its input and walks a fixed element list.
pub struct FakeBackend {
    elements: Mutex<Vec<FakeElement>>,
    fail: bool,
}

impl FakeBackend {
    pub fn new(elements: Vec<FakeElement>) -> Self {
        Self { elements: Mutex::new(elements), fail: false }
    }

    /// A backend whose every transform fails.
    pub fn failing() -> Self {
        Self { elements: Mutex::new(Vec::new()), fail: true }
    }

    pub fn elements(&self) -> Vec<FakeElement> {
        self.elements.lock().unwrap().clone()
    }
}

impl MarkupBackend for FakeBackend {
    fn transform(&self, _markup: &str, selectors: &[&str], visitor: &mut ElementVisitor<'_>) -> Result<String, RewriteError> {
        if self.fail {
            return Err(RewriteError::Transform("fake parse failure".into()));
        }

        let mut elements = self.elements.lock().unwrap();
        for element in elements.iter_mut() {
            if selectors.iter().any(|s| element.matches(s)) {
                visitor(element)?;
            }
        }

        Ok(elements.iter().map(FakeElement::serialize).collect())
    }
}
