//! Last-known-good response cache

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::application::errors::StoreError;
use crate::config::StaleCacheConfig;
use crate::infrastructure::resilience::StoreGuard;
use crate::infrastructure::store::SharedStore;

/// Stores successful payloads so they can be replayed while degraded
pub struct StaleCache {
    store: Arc<dyn SharedStore>,
    guard: StoreGuard,
    ttl: Duration,
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StaleCache {
    pub fn new(store: Arc<dyn SharedStore>, guard: StoreGuard, config: &StaleCacheConfig) -> Self {
        Self {
            store,
            guard,
            ttl: Duration::from_secs(config.ttl_seconds),
            enabled: config.enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn key(key: &str) -> String {
        format!("stale:{}", key)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Remember the latest good payload for `key`
    pub async fn put(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        if !self.enabled {
            return Ok(());
        }
        let key = Self::key(key);
        self.guard
            .run(
                "stale_cache_put",
                self.store.set(&key, payload, Some(self.ttl)),
            )
            .await
    }

    /// Fetch the stored payload, counting the lookup as a hit or miss
    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if !self.enabled {
            return Ok(None);
        }
        let stored_key = Self::key(key);
        let value = self
            .guard
            .run("stale_cache_get", self.store.get(&stored_key))
            .await?;
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        debug!(key = key, hit = value.is_some(), "Stale cache lookup");
        Ok(value)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Lookup counters since startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups that found an entry; 0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::InMemoryStore;

    #[tokio::test]
    async fn test_put_get_and_hit_rate() {
        let cache = StaleCache::new(
            Arc::new(InMemoryStore::new()),
            StoreGuard::default(),
            &StaleCacheConfig::default(),
        );
        cache.put("/posts", "[1,2,3]").await.unwrap();
        assert_eq!(cache.get("/posts").await.unwrap().as_deref(), Some("[1,2,3]"));
        assert_eq!(cache.get("/missing").await.unwrap(), None);

        let stats = cache.stats();
        assert_eq!(stats, CacheStats { hits: 1, misses: 1 });
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_disabled_cache_stores_nothing() {
        let config = StaleCacheConfig {
            enabled: false,
            ..StaleCacheConfig::default()
        };
        let cache = StaleCache::new(Arc::new(InMemoryStore::new()), StoreGuard::default(), &config);
        cache.put("k", "v").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.stats().hit_rate(), 0.0);
    }
}
