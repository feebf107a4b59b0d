//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (REFLUX_*)
//! 2. TOML config file (if REFLUX_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// How the upstream transport treats 3xx responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectPolicy {
    /// The HTTP client follows redirects itself, up to `max_redirects`.
    Follow,
    /// Redirects are never followed by the transport; every 3xx becomes a
    /// client-side refresh document.
    Surface,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REFLUX_*)
/// 2. TOML config file (if REFLUX_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to.
    ///
    /// Set via REFLUX_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Route prefix that every rewritten reference points back to.
    ///
    /// Set via REFLUX_PROXY_PATH environment variable.
    #[serde(default = "default_proxy_path")]
    pub proxy_path: String,

    /// User-Agent string for upstream requests.
    ///
    /// Set via REFLUX_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via REFLUX_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum upstream body size in bytes.
    ///
    /// Set via REFLUX_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Redirect handling for upstream requests.
    ///
    /// Set via REFLUX_REDIRECT_POLICY environment variable (`follow` or `surface`).
    #[serde(default = "default_redirect_policy")]
    pub redirect_policy: RedirectPolicy,

    /// Maximum redirects followed when `redirect_policy` is `follow`.
    ///
    /// Set via REFLUX_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Lifetime of a cached artifact in seconds.
    ///
    /// Set via REFLUX_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of distinct artifacts held in the cache.
    ///
    /// Set via REFLUX_CACHE_MAX_ENTRIES environment variable.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Total upstream attempts per proxied request (1 disables retries).
    ///
    /// Set via REFLUX_RETRY_ATTEMPTS environment variable.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds, doubled after each attempt.
    ///
    /// Set via REFLUX_RETRY_DELAY_MS environment variable.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".into()
}

fn default_proxy_path() -> String {
    "/proxy".into()
}

fn default_user_agent() -> String {
    "reflux/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_redirect_policy() -> RedirectPolicy {
    RedirectPolicy::Follow
}

fn default_max_redirects() -> usize {
    10
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    100
}

fn default_retry_attempts() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            proxy_path: default_proxy_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            redirect_policy: default_redirect_policy(),
            max_redirects: default_max_redirects(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache TTL as Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `REFLUX_`
    /// 2. TOML file from `REFLUX_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("REFLUX_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("REFLUX_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
