use std::fmt::Display;

use tokio::time::{sleep, Duration};
use tracing::{error, warn};

use crate::config::settings::RetryConfig;
use crate::utils::constants::{
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS,
};

/// Errors that may succeed when the same operation is attempted again.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

impl From<&RetryConfig> for RetrySettings {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            attempts: cfg.attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS).max(1),
            base_delay_ms: cfg.base_delay_ms.unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS),
            max_delay_ms: cfg.max_delay_ms.unwrap_or(DEFAULT_RETRY_MAX_DELAY_MS),
        }
    }
}

impl RetrySettings {
    /// Run `operation` until it succeeds, fails with a non-transient error, or attempts run out.
    pub async fn run_with_retry<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let attempts = self.attempts.max(1);
        let mut delay = self.base_delay_ms;

        for attempt in 1..attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    warn!("Attempt {attempt}/{attempts} failed: {e}");
                    sleep(Duration::from_millis(delay)).await;
                    delay = self.next_delay(delay);
                }
                Err(e) => return Err(e),
            }
        }

        operation().await.inspect_err(|e| {
            if e.is_transient() {
                error!("all {attempts} attempts failed: {e}");
            }
        })
    }

    /// Doubled delay, capped by `max_delay_ms`.
    fn next_delay(&self, delay: u64) -> u64 {
        delay.saturating_mul(2).min(self.max_delay_ms)
    }
}
