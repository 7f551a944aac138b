//! Caching of sandbox evaluation results

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Cache key: full script text plus the bound argument
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvaluationKey {
    script: Arc<str>,
    argument_name: String,
    argument_value: String,
}

impl EvaluationKey {
    pub fn new(script: &str, argument_name: &str, argument_value: &str) -> Self {
        Self {
            script: Arc::from(script),
            argument_name: argument_name.to_string(),
            argument_value: argument_value.to_string(),
        }
    }
}

/// Evaluation results keyed by script and argument
#[derive(Clone)]
pub struct EvaluationCache {
    cache: Cache<EvaluationKey, String>,
}

impl EvaluationCache {
    /// Create a cache with TTL and max capacity
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
        }
    }

    pub async fn get(&self, key: &EvaluationKey) -> Option<String> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: EvaluationKey, result: String) {
        self.cache.insert(key, result).await;
    }
}
