//! HTTP mapping of proxy failures.
//!
//! Bodies are plain text: the bare message for input errors and
//! `Proxy error: ...` for everything else.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reflux_core::Error;

use crate::routes::apply_cors;

/// A failed proxy request, rendered as a plain-text response.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ProxyError(#[from] pub Error);

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn message(&self) -> String {
        match &self.0 {
            Error::InvalidInput(msg) => msg.clone(),
            other => format!("Proxy error: {other}"),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "proxy request failed");
        }

        let mut response = (status, self.message()).into_response();
        apply_cors(response.headers_mut());
        response
    }
}
