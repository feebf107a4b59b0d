//! HTTP routes.
//!
//! - `GET <proxy_path>?url=...`: cached fetch through the pipeline
//! - `GET /health`: liveness
//! - `GET /meta`: build info, active configuration, cache statistics

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use reflux_client::artifact_bytes;
use reflux_core::{Artifact, Error};

use crate::error::ProxyError;
use crate::state::AppState;

/// Upstream framing headers; the proxy re-frames every body it sends.
pub const FRAMING_HEADERS: &[&str] = &[
    "connection",
    "content-encoding",
    "content-length",
    "content-transfer-encoding",
    "keep-alive",
    "transfer-encoding",
];

/// Build the application router around `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let proxy_path = state.config.proxy_path.clone();

    Router::new()
        .route(&proxy_path, get(proxy_handler))
        .route("/health", get(health_handler))
        .route("/meta", get(meta_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
}

/// GET <proxy_path>: serve `url` from the cache, fetching it on a miss.
///
/// The cache key is the raw `url` value as received.
async fn proxy_handler(
    State(state): State<Arc<AppState>>, Query(params): Query<ProxyParams>,
) -> Result<Response, ProxyError> {
    let target = params
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| Error::InvalidInput("Missing URL".to_string()))?;

    if let Some(artifact) = state.cache.get(&target) {
        tracing::debug!(url = %target, "serving from cache");
        return Ok(artifact_response(&artifact)?);
    }

    let artifact = state.pipeline.fetch_with_retry(&target, &state.retry).await?;
    state.cache.set(&target, artifact.clone());

    Ok(artifact_response(&artifact)?)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn meta_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "reflux",
        "version": env!("CARGO_PKG_VERSION"),
        "proxy_path": state.config.proxy_path,
        "redirect_policy": state.config.redirect_policy,
        "retry_attempts": state.retry.attempts,
        "cache": state.cache.stats(),
    }))
}

/// Turn an artifact into the bytes and headers sent to the client.
///
/// Base64 bodies are decoded. Header values that are not valid on the wire
/// are dropped.
pub fn artifact_response(artifact: &Artifact) -> Result<Response, Error> {
    let bytes = artifact_bytes(artifact)?;
    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();

    for (name, value) in &artifact.headers {
        if FRAMING_HEADERS.contains(&name.as_str()) {
            continue;
        }
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::debug!(header = %name, "dropping unrepresentable header"),
        }
    }

    apply_cors(headers);
    Ok(response)
}

/// CORS and sniffing headers set on every proxy response.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
}
