//! Infrastructure Layer - store-backed components
//!
//! Every component reaches shared state through [`store::SharedStore`];
//! the circuit breaker is the only process-local state.

pub mod blocklist;
pub mod cache;
pub mod events;
pub mod kill_switch;
pub mod rate_limiter;
pub mod resilience;
pub mod store;
pub mod traffic;

pub use blocklist::{BlocklistEntry, BlocklistService};
pub use cache::{CacheStats, StaleCache};
pub use events::SecurityEventLog;
pub use kill_switch::KillSwitch;
pub use rate_limiter::{RateLimitPolicy, RateLimitResult, RateLimiterService};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState, StoreGuard};
pub use store::{InMemoryStore, RedisStore, SharedStore};
pub use traffic::{TrafficMetrics, TrafficMode, TrafficMonitor};
