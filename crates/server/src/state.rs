//! Shared state handed to every request handler.

use reflux_client::{FetchConfig, FetchPipeline, RetryPolicy};
use reflux_core::{AppConfig, Error, ResponseCache};

/// Process-wide proxy state: one fetch pipeline and one response cache.
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: FetchPipeline,
    pub cache: ResponseCache,
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let pipeline = FetchPipeline::new(FetchConfig::from(&config))?;
        let cache = ResponseCache::new(config.cache_max_entries, config.cache_ttl());
        let retry = RetryPolicy::from(&config);

        Ok(Self { config, pipeline, cache, retry })
    }
}
