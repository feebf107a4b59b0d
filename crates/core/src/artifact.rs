//! The unit produced by one proxied fetch and stored in the cache.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Header flagging a base64-encoded body.
pub const TRANSFER_ENCODING_HEADER: &str = "content-transfer-encoding";

/// Response body and sanitized headers for one proxied resource.
///
/// Header names are stored lower-cased. When
/// `content-transfer-encoding: base64` is present the body holds base64 text
/// that must be decoded before it is sent to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

impl Artifact {
    pub fn new(body: impl Into<String>, headers: BTreeMap<String, String>) -> Self {
        let headers = headers.into_iter().map(|(name, value)| (name.to_ascii_lowercase(), value)).collect();
        Self { body: body.into(), headers }
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Whether `body` is base64 text standing in for binary content.
    pub fn is_base64(&self) -> bool {
        self.header(TRANSFER_ENCODING_HEADER)
            .is_some_and(|v| v.eq_ignore_ascii_case("base64"))
    }
}
