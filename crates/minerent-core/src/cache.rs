//! Process-wide TTL cache for market-data values.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

/// Default freshness window for cached metrics.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Thread-safe key → (value, fetch time) store.
///
/// Entries are only ever overwritten, never evicted. The lock is released
/// while a fetch runs, so concurrent misses on one key each fetch
/// independently and the last writer wins.
#[derive(Debug, Clone)]
pub struct MetricCache {
    entries: Arc<tokio::sync::RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl Default for MetricCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl MetricCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Value for `key` if it was fetched less than one TTL ago.
    pub async fn get_fresh(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Last stored value for `key`, however old.
    pub async fn last_value(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub async fn put(&self, key: impl Into<String>, value: Value) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Returns the fresh cached value, or runs `fetch`, stores its result
    /// stamped with the current time, and returns it.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Value
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Value>,
    {
        if let Some(value) = self.get_fresh(key).await {
            debug!(key, "cache hit");
            return value;
        }

        debug!(key, "cache miss, fetching");
        let value = fetch().await;
        self.put(key, value.clone()).await;
        value
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
