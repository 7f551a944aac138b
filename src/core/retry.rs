//! Backoff for sandbox context creation

use crate::error::SandboxError;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// Boxed future returned by a retried operation
pub type RetryFuture<T> = Pin<Box<dyn Future<Output = Result<T, SandboxError>> + Send>>;

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no backoff
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set maximum retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set initial delay
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Set maximum delay
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set jitter factor, clamped to 0.0..=1.0
    pub fn with_jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    /// Delay that follows `delay` under exponential backoff, capped at `max_delay`
    pub fn next_delay(&self, delay: Duration) -> Duration {
        let next =
            Duration::from_millis((delay.as_millis() as f64 * self.backoff_multiplier) as u64);
        next.min(self.max_delay)
    }

    fn jitter(&self, delay: Duration) -> Duration {
        if self.jitter_factor <= 0.0 {
            return Duration::ZERO;
        }
        let jitter_range = delay.as_millis() as f64 * self.jitter_factor;
        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
        Duration::from_millis(jitter.abs() as u64)
    }
}

/// Retry executor
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with configuration
    pub fn with_config(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Run `func` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent
    pub async fn execute<F, T>(&self, mut func: F) -> Result<T, SandboxError>
    where
        F: FnMut() -> RetryFuture<T>,
    {
        let mut delay = self.config.initial_delay;
        let mut attempt = 0;

        loop {
            let error = match func().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.config.max_retries {
                return Err(error);
            }

            attempt += 1;
            let total_delay = delay + self.config.jitter(delay);
            debug!(attempt, delay = ?total_delay, error = %error, "Retrying after failure");
            tokio::time::sleep(total_delay).await;
            delay = self.config.next_delay(delay);
        }
    }
}
