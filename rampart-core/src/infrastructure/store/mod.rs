//! Shared Store Backends
//!
//! Every stateful component (rate limiter, blocklist, kill switch, traffic
//! monitor, stale cache, security event log) keeps its state behind the
//! [`SharedStore`] trait so that multiple gateway instances can share it:
//! - Redis/Dragonfly for distributed, production use
//! - In-memory for development and single-instance deployments

pub mod memory;
pub mod redis;

pub use self::memory::InMemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::application::errors::StoreError;
use crate::config::{StoreBackend, StoreConfig};

/// Key-value store with atomic counters, expiry and bounded lists
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Atomically increment `key` and return the new value.
    ///
    /// When the key does not exist it is created with value 1 and `ttl`
    /// applied, so the expiry is anchored on the first increment. `None`
    /// creates a persistent counter.
    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64, StoreError>;

    /// Read a string value
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a string value; `None` keeps it until explicitly deleted
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Delete a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Remaining lifetime of a key; `None` if absent or persistent
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    /// Prepend to a list and trim it to `max_len` entries
    async fn push_capped(&self, key: &str, value: &str, max_len: usize)
    -> Result<(), StoreError>;

    /// Newest-first slice of a list
    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError>;

    /// Liveness check
    async fn ping(&self) -> Result<(), StoreError>;

    /// Drop expired entries (only meaningful for in-memory storage)
    async fn cleanup(&self) {}
}

/// Build the configured store, falling back to memory when Redis is unreachable
pub async fn connect(config: &StoreConfig) -> Arc<dyn SharedStore> {
    match config.backend {
        StoreBackend::Redis => match RedisStore::new(&config.url).await {
            Ok(store) => {
                info!(url = %config.url, "Using Redis store backend");
                Arc::new(store)
            }
            Err(e) => {
                warn!(
                    url = %config.url,
                    error = %e,
                    "Failed to connect to Redis, falling back to in-memory store"
                );
                Arc::new(InMemoryStore::new())
            }
        },
        StoreBackend::Memory => {
            info!("Using in-memory store backend");
            Arc::new(InMemoryStore::new())
        }
    }
}

/// Periodically purge expired entries from the store until cancelled
pub fn spawn_cleanup_task(
    store: Arc<dyn SharedStore>,
    interval: Duration,
    shutdown: tokio_util::sync::CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    store.cleanup().await;
                }
                _ = shutdown.cancelled() => {
                    tracing::debug!("Store cleanup task shutting down");
                    return;
                }
            }
        }
    });
}
