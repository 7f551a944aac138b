//! Sandbox client configuration

use crate::core::retry::RetryConfig;
use std::time::Duration;

/// Default per-evaluation timeout
pub const DEFAULT_EVALUATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default lifetime of cached evaluation results
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default number of cached evaluation results
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Configuration for [`ScriptEvaluationClient`](crate::sandbox::ScriptEvaluationClient)
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxConfig {
    /// Per-call timeout; `None` waits for the sandbox indefinitely
    pub evaluation_timeout: Option<Duration>,
    /// Backoff applied inside the shared context creation
    pub creation_retry: RetryConfig,
    /// Lifetime of cached results; `None` disables the cache
    pub cache_ttl: Option<Duration>,
    /// Maximum number of cached results
    pub cache_capacity: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            evaluation_timeout: Some(DEFAULT_EVALUATION_TIMEOUT),
            creation_retry: RetryConfig::default(),
            cache_ttl: Some(DEFAULT_CACHE_TTL),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl SandboxConfig {
    /// Create configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-call timeout
    pub fn with_evaluation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.evaluation_timeout = timeout;
        self
    }

    /// Set the context creation backoff
    pub fn with_creation_retry(mut self, retry: RetryConfig) -> Self {
        self.creation_retry = retry;
        self
    }

    /// Set the result cache lifetime
    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the result cache capacity
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Disable result caching
    pub fn without_cache(self) -> Self {
        self.with_cache_ttl(None)
    }

    /// Check if results are cached
    pub fn cache_enabled(&self) -> bool {
        self.cache_ttl.is_some() && self.cache_capacity > 0
    }
}
