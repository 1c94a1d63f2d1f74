//! Stale-response fallback
//!
//! Successful results are remembered per key. While the system is degraded
//! (high traffic or an open circuit) a failure is answered with the last good
//! result instead. Outside degraded windows failures propagate unchanged.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::infrastructure::{CircuitBreaker, StaleCache, TrafficMonitor};

/// A result tagged with its freshness
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served<T> {
    Fresh(T),
    Stale(T),
}

impl<T> Served<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Served::Stale(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Served::Fresh(value) | Served::Stale(value) => value,
        }
    }
}

pub struct StaleFallback {
    cache: Arc<StaleCache>,
    traffic: Arc<TrafficMonitor>,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl StaleFallback {
    pub fn new(
        cache: Arc<StaleCache>,
        traffic: Arc<TrafficMonitor>,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            cache,
            traffic,
            circuit_breaker,
        }
    }

    /// High traffic (measured or forced) or an open circuit
    pub async fn is_degraded(&self) -> bool {
        self.circuit_breaker.is_open().await || self.traffic.is_high_traffic_mode().await
    }

    /// Run `operation`, falling back to the cached value for `key` when it
    /// fails during a degraded window
    pub async fn serve<T, E, Fut>(&self, key: Option<&str>, operation: Fut) -> Result<Served<T>, E>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<T, E>>,
    {
        let error = match operation.await {
            Ok(value) => {
                if let Some(key) = key {
                    match serde_json::to_string(&value) {
                        Ok(payload) => self.remember(key, &payload).await,
                        Err(e) => debug!(key = key, error = %e, "Result is not cacheable"),
                    }
                }
                return Ok(Served::Fresh(value));
            }
            Err(error) => error,
        };

        let Some(key) = key else {
            return Err(error);
        };

        match self.stale_payload(key).await {
            Some(payload) => match serde_json::from_str(&payload) {
                Ok(value) => Ok(Served::Stale(value)),
                Err(e) => {
                    warn!(key = key, error = %e, "Discarding undecodable stale entry");
                    Err(error)
                }
            },
            None => Err(error),
        }
    }

    /// Store a raw payload as the last good response for `key`
    pub async fn remember(&self, key: &str, payload: &str) {
        if let Err(e) = self.cache.put(key, payload).await {
            warn!(key = key, error = %e, "Failed to store stale copy");
        }
    }

    /// Raw cached payload for `key`, only while degraded
    pub async fn stale_payload(&self, key: &str) -> Option<String> {
        if !self.is_degraded().await {
            return None;
        }
        match self.cache.get(key).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = key, error = %e, "Stale cache lookup failed");
                None
            }
        }
    }

    pub fn cache(&self) -> &Arc<StaleCache> {
        &self.cache
    }
}
