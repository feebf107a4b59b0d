//! Unified error types for reflux.
//!
//! Only input errors and upstream fetch errors ever reach a client. Rewrite and
//! cache failures are absorbed where they happen and never appear here.

/// Unified error types for the reflux proxy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., missing target URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Target URL could not be parsed or uses an unsupported scheme.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Upstream request did not complete in time.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Upstream response body exceeds the configured limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Transport-level failure talking to the upstream host.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),
}

impl Error {
    /// HTTP status a client sees for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::InvalidUrl(_)
            | Error::FetchTimeout(_)
            | Error::FetchTooLarge(_)
            | Error::HttpError(_) => 500,
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::FetchTimeout(_) | Error::HttpError(_))
    }
}
