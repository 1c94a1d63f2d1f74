//! Gateway controllers and shared state

pub mod admin;
pub mod events;
pub mod health;

use std::sync::Arc;

use rampart_core::Config;
use rampart_core::application::{AdmissionService, StaleFallback};
use rampart_core::domain::BotScorer;
use rampart_core::infrastructure::{
    BlocklistService, CircuitBreaker, KillSwitch, RateLimiterService, SecurityEventLog,
    SharedStore, StaleCache, StoreGuard, TrafficMonitor,
};

/// Application state shared by middleware and controllers
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub store: Arc<dyn SharedStore>,
    pub guard: StoreGuard,
    pub bot_scorer: Arc<BotScorer>,
    pub kill_switch: Arc<KillSwitch>,
    pub blocklist: Arc<BlocklistService>,
    pub rate_limiter: Arc<RateLimiterService>,
    pub circuit_breaker: Arc<CircuitBreaker>,
    pub traffic: Arc<TrafficMonitor>,
    pub events: Arc<SecurityEventLog>,
    pub admission: Arc<AdmissionService>,
    pub fallback: Arc<StaleFallback>,
}

impl GatewayState {
    /// Wire every component over one shared store
    pub fn new(config: Config, store: Arc<dyn SharedStore>) -> Self {
        let guard = StoreGuard::from_config(&config.resilience);

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

        let admission = Arc::new(AdmissionService::new(
            kill_switch.clone(),
            blocklist.clone(),
            rate_limiter.clone(),
            circuit_breaker.clone(),
            traffic.clone(),
            events.clone(),
        ));
        let fallback = Arc::new(StaleFallback::new(
            cache,
            traffic.clone(),
            circuit_breaker.clone(),
        ));

        Self {
            bot_scorer: Arc::new(BotScorer::new(&config.bot_detection)),
            config: Arc::new(config),
            store,
            guard,
            kill_switch,
            blocklist,
            rate_limiter,
            circuit_breaker,
            traffic,
            events,
            admission,
            fallback,
        }
    }
}
