//! Store doubles for failure-path tests

use async_trait::async_trait;
use std::time::Duration;

use rampart_core::application::StoreError;
use rampart_core::infrastructure::{InMemoryStore, SharedStore};

/// Store whose every operation fails as if Redis were down
#[derive(Debug, Default)]
pub struct FailingStore;

fn down<T>() -> Result<T, StoreError> {
    Err(StoreError::unavailable("connection refused"))
}

#[async_trait]
impl SharedStore for FailingStore {
    async fn incr(&self, _key: &str, _ttl: Option<Duration>) -> Result<i64, StoreError> {
        down()
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        down()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), StoreError> {
        down()
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        down()
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, StoreError> {
        down()
    }

    async fn push_capped(&self, _key: &str, _value: &str, _max_len: usize) -> Result<(), StoreError> {
        down()
    }

    async fn list_range(&self, _key: &str, _limit: usize) -> Result<Vec<String>, StoreError> {
        down()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        down()
    }
}

/// In-memory store that answers only after a delay
#[derive(Debug)]
pub struct SlowStore {
    inner: InMemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl SharedStore for SlowStore {
    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.incr(key, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(key).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.ttl(key).await
    }

    async fn push_capped(&self, key: &str, value: &str, max_len: usize) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.push_capped(key, value, max_len).await
    }

    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_range(key, limit).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.ping().await
    }
}
