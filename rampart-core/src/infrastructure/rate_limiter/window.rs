//! Window counting algorithms
//!
//! Both algorithms rely solely on the store's atomic increment, so concurrent
//! requests for the same fingerprint never lose an update.
//!
//! - **Rolling**: one counter per fingerprint, created with the window as its
//!   expiry. The window starts at the first request and the counter vanishes
//!   once it elapses.
//! - **Weighted**: a counter per fixed bucket; the previous bucket contributes
//!   in proportion to how much of it still overlaps the sliding window.

use std::sync::Arc;
use std::time::Duration;

use super::types::current_time_millis;
use crate::application::errors::StoreError;
use crate::config::WindowAlgorithm;
use crate::infrastructure::store::SharedStore;

/// Counter state after recording one hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Requests counted in the window, including this one
    pub count: u64,
    /// Unix timestamp in milliseconds when the window resets
    pub reset_at: u64,
}

/// Sliding window counter over a shared store
pub struct SlidingWindow {
    store: Arc<dyn SharedStore>,
    algorithm: WindowAlgorithm,
}

impl SlidingWindow {
    pub fn new(store: Arc<dyn SharedStore>, algorithm: WindowAlgorithm) -> Self {
        Self { store, algorithm }
    }

    pub fn algorithm(&self) -> WindowAlgorithm {
        self.algorithm
    }

    /// Record a hit for `key` and return the resulting window count
    pub async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit, StoreError> {
        match self.algorithm {
            WindowAlgorithm::Rolling => self.hit_rolling(key, window).await,
            WindowAlgorithm::Weighted => self.hit_weighted(key, window).await,
        }
    }

    async fn hit_rolling(&self, key: &str, window: Duration) -> Result<WindowHit, StoreError> {
        let count = self.store.incr(key, Some(window)).await?;
        let remaining = self.store.ttl(key).await?.unwrap_or(window);
        Ok(WindowHit {
            count: count.max(0) as u64,
            reset_at: current_time_millis() + remaining.as_millis() as u64,
        })
    }

    async fn hit_weighted(&self, key: &str, window: Duration) -> Result<WindowHit, StoreError> {
        let window_ms = (window.as_millis() as u64).max(1);
        let now = current_time_millis();
        let bucket = now / window_ms;

        let current_key = format!("{}:{}", key, bucket);
        let previous_key = format!("{}:{}", key, bucket.saturating_sub(1));

        // Buckets must outlive the following bucket to serve as "previous"
        let current = self.store.incr(&current_key, Some(window * 2)).await?.max(0) as u64;
        let previous = match self.store.get(&previous_key).await? {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| StoreError::corrupt(&previous_key, "counter is not an integer"))?,
            None => 0,
        };

        let elapsed_ratio = (now % window_ms) as f64 / window_ms as f64;
        let weighted_previous = (previous as f64 * (1.0 - elapsed_ratio)).ceil() as u64;

        Ok(WindowHit {
            count: current + weighted_previous,
            reset_at: (bucket + 1) * window_ms,
        })
    }
}
