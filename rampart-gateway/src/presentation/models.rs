//! API request and response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rampart_core::domain::SecurityEvent;
use rampart_core::infrastructure::resilience::CircuitBreakerStats;
use rampart_core::infrastructure::{BlocklistEntry, CacheStats, CircuitState, TrafficMetrics};

/// Error response shared by every endpoint and by admission denials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional error context
    pub details: Option<serde_json::Value>,

    /// Unique request identifier for tracking and support
    pub request_id: Uuid,

    /// Timestamp when the error occurred
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` when the shared store answers, `degraded` otherwise
    pub status: String,
    pub store: String,
    pub failure_policy: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Circuit breaker view for metrics and admin responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerDto {
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub reset_timeout_seconds: u64,
    pub last_failure_seconds_ago: Option<u64>,
}

impl CircuitBreakerDto {
    pub fn new(stats: CircuitBreakerStats, failure_threshold: u32, reset_timeout_seconds: u64) -> Self {
        Self {
            state: stats.state,
            failure_count: stats.failure_count,
            failure_threshold,
            reset_timeout_seconds,
            last_failure_seconds_ago: stats.last_failure_age.map(|age| age.as_secs()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsDto {
    pub enabled: bool,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

impl CacheStatsDto {
    pub fn new(enabled: bool, stats: CacheStats) -> Self {
        Self {
            enabled,
            hits: stats.hits,
            misses: stats.misses,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// GET /metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub traffic: TrafficMetrics,
    pub circuit_breaker: CircuitBreakerDto,
    pub cache: CacheStatsDto,
    /// `healthy`, or `unavailable` while the circuit is open
    pub database_status: String,
    pub store_status: String,
    pub kill_switch: bool,
    pub rate_limiting_enabled: bool,
    pub timestamp: DateTime<Utc>,
}

/// POST /admin/blocklist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockIpRequest {
    pub ip: String,
    /// Omitted uses the configured default; 0 blocks permanently
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// `ip` from the query string or a JSON body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpParams {
    #[serde(default)]
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocklistStatusResponse {
    pub ip: String,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<BlocklistEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnblockResponse {
    pub ip: String,
    /// Whether a block existed
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillSwitchRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillSwitchResponse {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficModeRequest {
    pub high: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficModeResponse {
    /// Operator override state
    pub high: bool,
    pub expires_in_seconds: Option<u64>,
    /// Measured high traffic or override
    pub is_high_traffic: bool,
    pub requests_per_second: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityEventsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEventsResponse {
    pub events: Vec<SecurityEvent>,
    pub count: usize,
}
