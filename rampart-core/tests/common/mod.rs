//! Common test utilities for rampart-core

#![allow(dead_code)]

pub mod stores;

pub use stores::*;

use std::sync::Arc;
use std::time::Duration;

use rampart_core::application::{AdmissionService, StaleFallback};
use rampart_core::config::{Config, FailurePolicy};
use rampart_core::domain::{AdmissionRequest, Fingerprint, RouteClass};
use rampart_core::infrastructure::{
    BlocklistService, CircuitBreaker, KillSwitch, RateLimiterService, SecurityEventLog,
    SharedStore, StaleCache, StoreGuard, TrafficMonitor,
};

/// Guard with a short timeout so slow-store tests finish quickly
pub fn fast_guard(policy: FailurePolicy) -> StoreGuard {
    StoreGuard::new(policy, Duration::from_millis(50))
}

/// Every component wired over one store, as the gateway does it
pub struct Harness {
    pub store: Arc<dyn SharedStore>,
    pub kill_switch: Arc<KillSwitch>,
    pub blocklist: Arc<BlocklistService>,
    pub rate_limiter: Arc<RateLimiterService>,
    pub circuit_breaker: Arc<CircuitBreaker>,
    pub traffic: Arc<TrafficMonitor>,
    pub events: Arc<SecurityEventLog>,
    pub cache: Arc<StaleCache>,
    pub admission: AdmissionService,
    pub fallback: StaleFallback,
}

impl Harness {
    pub fn new(store: Arc<dyn SharedStore>, config: &Config, guard: StoreGuard) -> Self {
        let kill_switch = Arc::new(KillSwitch::new(store.clone(), guard));
        let blocklist = Arc::new(BlocklistService::new(
            store.clone(),
            guard,
            config.blocklist.default_ttl_seconds,
        ));
        let rate_limiter = Arc::new(RateLimiterService::new(
            store.clone(),
            config.rate_limit.clone(),
            guard,
        ));
        let circuit_breaker = Arc::new(CircuitBreaker::new(
            config.circuit_breaker.to_circuit_breaker_config(),
        ));
        let traffic = Arc::new(TrafficMonitor::new(
            store.clone(),
            guard,
            config.traffic.clone(),
        ));
        let events = Arc::new(SecurityEventLog::new(
            store.clone(),
            guard,
            config.events.max_entries,
        ));
        let cache = Arc::new(StaleCache::new(store.clone(), guard, &config.stale_cache));

        let admission = AdmissionService::new(
            kill_switch.clone(),
            blocklist.clone(),
            rate_limiter.clone(),
            circuit_breaker.clone(),
            traffic.clone(),
            events.clone(),
        );
        let fallback = StaleFallback::new(cache.clone(), traffic.clone(), circuit_breaker.clone());

        Self {
            store,
            kill_switch,
            blocklist,
            rate_limiter,
            circuit_breaker,
            traffic,
            events,
            cache,
            admission,
            fallback,
        }
    }

    /// Harness over a fresh in-memory store with default configuration
    pub fn in_memory() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Self::new(
            Arc::new(rampart_core::infrastructure::InMemoryStore::new()),
            config,
            fast_guard(FailurePolicy::Open),
        )
    }
}

pub fn request(ip: &str, route_class: RouteClass, method: &str) -> AdmissionRequest {
    AdmissionRequest::new(Fingerprint::for_ip(Some(ip)), route_class, method)
        .with_ip(ip)
        .with_path("/api/posts")
}
