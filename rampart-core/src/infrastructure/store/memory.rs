//! In-memory store for development and single-instance deployments

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use super::SharedStore;
use crate::application::errors::StoreError;

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Counter(i64),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-memory store backend
///
/// A single write lock serialises mutations, which makes `incr` atomic the
/// same way the Redis script is.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SharedStore for InMemoryStore {
    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(key)
            && entry.is_live(now)
        {
            let next = match &entry.value {
                Value::Counter(count) => count + 1,
                Value::Text(text) => {
                    text.parse::<i64>()
                        .map_err(|_| StoreError::corrupt(key, "value is not an integer"))?
                        + 1
                }
                Value::List(_) => return Err(StoreError::corrupt(key, "cannot increment a list")),
            };
            entry.value = Value::Counter(next);
            return Ok(next);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Counter(1),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
        Ok(1)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => match &entry.value {
                Value::Text(text) => Ok(Some(text.clone())),
                Value::Counter(count) => Ok(Some(count.to_string())),
                Value::List(_) => Err(StoreError::corrupt(key, "cannot read a list as text")),
            },
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|e| e.is_live(Instant::now())))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn push_capped(
        &self,
        key: &str,
        value: &str,
        max_len: usize,
    ) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.to_string())
            .and_modify(|e| {
                if !e.is_live(now) {
                    *e = Entry {
                        value: Value::List(VecDeque::new()),
                        expires_at: None,
                    };
                }
            })
            .or_insert_with(|| Entry {
                value: Value::List(VecDeque::new()),
                expires_at: None,
            });

        match &mut entry.value {
            Value::List(list) => {
                list.push_front(value.to_string());
                list.truncate(max_len);
                Ok(())
            }
            _ => Err(StoreError::corrupt(key, "value is not a list")),
        }
    }

    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => match &entry.value {
                Value::List(list) => Ok(list.iter().take(limit).cloned().collect()),
                _ => Err(StoreError::corrupt(key, "value is not a list")),
            },
            _ => Ok(Vec::new()),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn cleanup(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        debug!(removed = before - entries.len(), "Completed store cleanup");
    }
}
