//! Bounded retry of transient upstream failures with exponential backoff.

use std::future::Future;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

use reflux_core::{AppConfig, Error};

/// How many times to attempt an upstream fetch and how long to wait between
/// attempts. The wait doubles after every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Never less than one.
    pub attempts: u32,
    /// Wait before the second attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RetryPolicy {
    fn from(config: &AppConfig) -> Self {
        Self::new(config.retry_attempts, config.retry_delay())
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self { attempts: attempts.max(1), base_delay }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base_delay)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(self.base_delay.max(Duration::from_secs(30)))
            .with_max_elapsed_time(None)
            .build()
    }

    /// Run `op` until it succeeds, fails permanently, or the attempts run out.
    ///
    /// Only errors for which [`Error::is_transient`] holds are retried.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut attempt = 0u32;
        let attempts = self.attempts;

        backoff::future::retry_notify(
            self.backoff(),
            || {
                attempt += 1;
                let last = attempt >= attempts;
                let pending = op();
                async move {
                    pending.await.map_err(|e| {
                        if e.is_transient() && !last { backoff::Error::transient(e) } else { backoff::Error::permanent(e) }
                    })
                }
            },
            |e: Error, wait: Duration| {
                tracing::warn!(error = %e, wait_ms = wait.as_millis() as u64, "upstream fetch failed, retrying");
            },
        )
        .await
    }
}
