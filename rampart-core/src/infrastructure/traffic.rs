//! Traffic monitor
//!
//! Counts requests into per-second buckets in the shared store so that the
//! measured rate covers every instance. An operator can force high-traffic
//! mode for a limited time independently of the measurement.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::StoreError;
use crate::config::TrafficConfig;
use crate::infrastructure::rate_limiter::types::current_time_secs;
use crate::infrastructure::resilience::StoreGuard;
use crate::infrastructure::store::SharedStore;

const MODE_KEY: &str = "traffic:mode";
const MODE_HIGH: &str = "high";

fn bucket_key(second: u64) -> String {
    format!("traffic:rps:{}", second)
}

/// Current traffic picture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrafficMetrics {
    pub requests_per_second: u64,
    /// Measured rate above the high threshold, or the operator override is set
    pub is_high_traffic: bool,
    /// Measured rate above the critical threshold
    pub should_serve_stale: bool,
    pub manual_override: bool,
}

/// Operator override state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrafficMode {
    pub high: bool,
    pub expires_in_seconds: Option<u64>,
}

pub struct TrafficMonitor {
    store: Arc<dyn SharedStore>,
    guard: StoreGuard,
    config: TrafficConfig,
}

impl TrafficMonitor {
    pub fn new(store: Arc<dyn SharedStore>, guard: StoreGuard, config: TrafficConfig) -> Self {
        Self {
            store,
            guard,
            config,
        }
    }

    /// Count one request in the current second's bucket
    pub async fn record_request(&self) {
        let key = bucket_key(current_time_secs());
        let ttl = Duration::from_secs(self.config.bucket_ttl_seconds);
        // Best effort; a lost count only skews the estimate
        let _ = self
            .guard
            .run("traffic_record", self.store.incr(&key, Some(ttl)))
            .await;
    }

    /// Measured rate and derived mode flags
    ///
    /// The rate is the larger of the current and the previous second, so a
    /// bucket that has just started does not hide a sustained load.
    pub async fn metrics(&self) -> TrafficMetrics {
        let measured = self.guard.run("traffic_metrics", self.read_rate()).await;
        let manual_override = self
            .guard
            .run_or("traffic_mode", self.read_override(), false, false)
            .await;

        let requests_per_second = match measured {
            Ok(rate) => rate,
            Err(_) => {
                let critical = self.config.critical_threshold.saturating_add(1);
                self.guard.policy().resolve(0, critical)
            }
        };

        TrafficMetrics {
            requests_per_second,
            is_high_traffic: requests_per_second > self.config.high_threshold || manual_override,
            should_serve_stale: requests_per_second > self.config.critical_threshold,
            manual_override,
        }
    }

    pub async fn is_high_traffic_mode(&self) -> bool {
        self.metrics().await.is_high_traffic
    }

    /// Force high-traffic mode on for the configured duration, or clear the override
    pub async fn set_mode(&self, high: bool) -> Result<(), StoreError> {
        if high {
            let ttl = Duration::from_secs(self.config.mode_ttl_seconds);
            self.store.set(MODE_KEY, MODE_HIGH, Some(ttl)).await
        } else {
            self.store.delete(MODE_KEY).await.map(|_| ())
        }
    }

    pub async fn mode(&self) -> Result<TrafficMode, StoreError> {
        let high = self.read_override().await?;
        let expires_in_seconds = if high {
            self.store.ttl(MODE_KEY).await?.map(|ttl| ttl.as_secs())
        } else {
            None
        };
        Ok(TrafficMode {
            high,
            expires_in_seconds,
        })
    }

    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    async fn read_rate(&self) -> Result<u64, StoreError> {
        let now = current_time_secs();
        let mut rate = 0;
        for second in [now, now.saturating_sub(1)] {
            if let Some(raw) = self.store.get(&bucket_key(second)).await? {
                let count = raw
                    .parse::<u64>()
                    .map_err(|_| StoreError::corrupt(bucket_key(second), "not a counter"))?;
                rate = rate.max(count);
            }
        }
        Ok(rate)
    }

    async fn read_override(&self) -> Result<bool, StoreError> {
        Ok(self.store.get(MODE_KEY).await?.as_deref() == Some(MODE_HIGH))
    }
}
