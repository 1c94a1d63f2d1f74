//! Health check and metrics endpoints

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;

use rampart_core::infrastructure::CircuitState;

use crate::presentation::controllers::GatewayState;
use crate::presentation::models::{
    CacheStatsDto, CircuitBreakerDto, HealthResponse, MetricsResponse,
};

pub const FAIL_MODE_HEADER: &str = "x-fail-mode";

/// GET /health
///
/// 200 while the shared store answers a ping, 503 otherwise. The active
/// store failure policy is reported in the `x-fail-mode` header.
pub async fn health_check(State(state): State<GatewayState>) -> Response {
    let store_up = match state.guard.run("health_ping", state.store.ping()).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: store ping failed");
            false
        }
    };

    let policy = state.guard.policy();
    let body = HealthResponse {
        status: if store_up { "healthy" } else { "degraded" }.to_string(),
        store: if store_up { "up" } else { "down" }.to_string(),
        failure_policy: policy.as_str().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    };
    let status = if store_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(FAIL_MODE_HEADER, HeaderValue::from_static(policy.as_str()));
    response
}

/// GET /metrics
pub async fn metrics(State(state): State<GatewayState>) -> Json<MetricsResponse> {
    let traffic = state.traffic.metrics().await;
    let breaker = state.circuit_breaker.snapshot().await;
    let breaker_config = state.circuit_breaker.config();
    let cache = state.fallback.cache();
    let store_up = state
        .guard
        .run("metrics_ping", state.store.ping())
        .await
        .is_ok();

    let database_status = match breaker.state {
        CircuitState::Closed => "healthy",
        CircuitState::Open => "unavailable",
    };

    Json(MetricsResponse {
        traffic,
        database_status: database_status.to_string(),
        circuit_breaker: CircuitBreakerDto::new(
            breaker,
            breaker_config.failure_threshold,
            breaker_config.reset_timeout.as_secs(),
        ),
        cache: CacheStatsDto::new(cache.is_enabled(), cache.stats()),
        store_status: if store_up { "up" } else { "down" }.to_string(),
        kill_switch: state.kill_switch.is_enabled().await,
        rate_limiting_enabled: state.rate_limiter.is_enabled(),
        timestamp: Utc::now(),
    })
}
