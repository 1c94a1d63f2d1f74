//! Resilience patterns: the datastore circuit breaker and guarded store calls

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::application::errors::StoreError;
use crate::config::{FailurePolicy, ResilienceConfig};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation
    Closed,
    /// Datastore considered failing; mutating requests are rejected
    Open,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Cumulative failures that open the circuit
    pub failure_threshold: u32,
    /// Time since the last failure after which a success may close the circuit
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 10,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

/// Circuit breaker guarding the primary datastore
///
/// **State Machine:**
/// ```text
///    ┌─────────────┐  failures >= threshold   ┌──────────────┐
///    │   CLOSED    │ ───────────────────────► │     OPEN     │
///    └─────────────┘                          └──────────────┘
///           ▲   success recorded after reset_timeout  │
///           └─────────────────────────────────────────┘
/// ```
///
/// Every success decrements the failure count (floor 0) instead of clearing
/// it, so a flapping datastore drifts toward the threshold. The state is
/// process-local; each instance protects itself.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Arc<Mutex<CircuitBreakerState>>,
}

#[derive(Debug)]
struct CircuitBreakerState {
    current_state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(CircuitBreakerState {
                current_state: CircuitState::Closed,
                failure_count: 0,
                last_failure_time: None,
            })),
        }
    }

    /// Record a failed datastore operation
    pub async fn record_failure(&self) {
        let mut state = self.state.lock().await;

        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure_time = Some(Instant::now());

        if state.current_state == CircuitState::Closed
            && state.failure_count >= self.config.failure_threshold
        {
            state.current_state = CircuitState::Open;
            warn!(
                failure_count = state.failure_count,
                threshold = self.config.failure_threshold,
                "Circuit breaker opened"
            );
        }
    }

    /// Record a successful datastore operation
    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;

        state.failure_count = state.failure_count.saturating_sub(1);

        if state.current_state == CircuitState::Open {
            let cooled_down = state
                .last_failure_time
                .is_none_or(|at| at.elapsed() > self.config.reset_timeout);
            if cooled_down {
                state.current_state = CircuitState::Closed;
                state.failure_count = 0;
                info!("Circuit breaker closed after cooldown");
            }
        }
    }

    pub async fn is_open(&self) -> bool {
        self.state.lock().await.current_state == CircuitState::Open
    }

    /// Run a datastore operation and record its outcome
    pub async fn call<T, E, Fut>(&self, operation: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let result = operation.await;
        match &result {
            Ok(_) => self.record_success().await,
            Err(_) => self.record_failure().await,
        }
        result
    }

    /// Get current circuit breaker state
    pub async fn get_state(&self) -> CircuitState {
        self.state.lock().await.current_state
    }

    /// Get current failure count
    pub async fn get_failure_count(&self) -> u32 {
        self.state.lock().await.failure_count
    }

    /// Point-in-time view for metrics
    pub async fn snapshot(&self) -> CircuitBreakerStats {
        let state = self.state.lock().await;
        CircuitBreakerStats {
            state: state.current_state,
            failure_count: state.failure_count,
            last_failure_age: state.last_failure_time.map(|at| at.elapsed()),
        }
    }

    /// Reset the circuit breaker to closed state
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.current_state = CircuitState::Closed;
        state.failure_count = 0;
        state.last_failure_time = None;
        info!("Circuit breaker reset");
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

/// Circuit breaker statistics
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_age: Option<Duration>,
}

/// Applies the store timeout and failure policy to store round trips
#[derive(Debug, Clone, Copy)]
pub struct StoreGuard {
    policy: FailurePolicy,
    timeout: Duration,
}

impl Default for StoreGuard {
    fn default() -> Self {
        Self::from_config(&ResilienceConfig::default())
    }
}

impl StoreGuard {
    pub fn new(policy: FailurePolicy, timeout: Duration) -> Self {
        Self { policy, timeout }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::new(config.store_failure_policy, config.store_timeout())
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Run a store operation under the configured timeout, logging failures
    pub async fn run<T, Fut>(&self, operation: &'static str, future: Fut) -> Result<T, StoreError>
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let error = match tokio::time::timeout(self.timeout, future).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => error,
            Err(_) => StoreError::Timeout {
                operation,
                timeout_ms: self.timeout.as_millis() as u64,
            },
        };

        warn!(
            operation = operation,
            error = %error,
            policy = self.policy.as_str(),
            "Store operation failed"
        );
        Err(error)
    }

    /// Run a store operation, substituting the policy's value on failure
    pub async fn run_or<T, Fut>(&self, operation: &'static str, future: Fut, open: T, closed: T) -> T
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        match self.run(operation, future).await {
            Ok(value) => value,
            Err(_) => self.policy.resolve(open, closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, reset_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            reset_timeout: Duration::from_millis(reset_ms),
        })
    }

    #[tokio::test]
    async fn test_starts_closed() {
        let cb = CircuitBreaker::default();
        assert_eq!(cb.get_state().await, CircuitState::Closed);
        assert_eq!(cb.config().failure_threshold, 10);
    }

    #[tokio::test]
    async fn test_success_decrements_with_floor() {
        let cb = breaker(5, 1000);
        cb.record_failure().await;
        cb.record_failure().await;
        cb.record_success().await;
        assert_eq!(cb.get_failure_count().await, 1);
        cb.record_success().await;
        cb.record_success().await;
        assert_eq!(cb.get_failure_count().await, 0);
    }

    #[tokio::test]
    async fn test_call_records_outcome() {
        let cb = breaker(2, 1000);
        let _ = cb.call(async { Err::<(), _>("db down") }).await;
        let _ = cb.call(async { Err::<(), _>("db down") }).await;
        assert!(cb.is_open().await);

        let value = cb.call(async { Ok::<_, &str>(7) }).await;
        assert_eq!(value, Ok(7));
        // Cooldown has not elapsed
        assert!(cb.is_open().await);
    }

    #[tokio::test]
    async fn test_reset_closes_immediately() {
        let cb = breaker(1, 60_000);
        cb.record_failure().await;
        assert!(cb.is_open().await);
        cb.reset().await;
        let stats = cb.snapshot().await;
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failure_count, 0);
        assert!(stats.last_failure_age.is_none());
    }

    #[tokio::test]
    async fn test_store_guard_times_out() {
        let guard = StoreGuard::new(FailurePolicy::Open, Duration::from_millis(10));
        let result = guard
            .run("slow", async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, StoreError>(1)
            })
            .await;
        assert!(matches!(result, Err(StoreError::Timeout { operation: "slow", .. })));
    }

    #[tokio::test]
    async fn test_store_guard_resolves_policy() {
        let failing = || async { Err::<bool, _>(StoreError::unavailable("down")) };

        let open = StoreGuard::new(FailurePolicy::Open, Duration::from_millis(50));
        assert!(!open.run_or("check", failing(), false, true).await);

        let closed = StoreGuard::new(FailurePolicy::Closed, Duration::from_millis(50));
        assert!(closed.run_or("check", failing(), false, true).await);
    }
}
