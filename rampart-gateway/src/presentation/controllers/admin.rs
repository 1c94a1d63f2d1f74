//! Admin endpoints: blocklist, kill switch, traffic mode and circuit breaker

use axum::{
    body::Bytes,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::de::DeserializeOwned;

use rampart_core::application::ApplicationError;
use rampart_core::domain::{SecurityEvent, SecurityEventKind};
use rampart_core::infrastructure::blocklist::normalize_ip;

use crate::presentation::controllers::GatewayState;
use crate::presentation::middleware::{application_error_to_response, error_response};
use crate::presentation::models::{
    BlockIpRequest, BlocklistStatusResponse, CircuitBreakerDto, ErrorResponse, IpParams,
    KillSwitchRequest, KillSwitchResponse, TrafficModeRequest, TrafficModeResponse,
    UnblockResponse,
};

fn bad_request(message: impl Into<String>) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        ErrorResponse::new("INVALID_REQUEST", message),
    )
}

/// Unwrap a JSON body, answering 400 for anything malformed
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| bad_request(rejection.body_text()))
}

fn optional_json_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| bad_request(format!("Invalid JSON body: {}", e)))
}

/// Canonical text form of an address, as the blocklist keys it
fn canonical_ip(raw: &str) -> Result<String, Response> {
    normalize_ip(raw)
        .map(|ip| ip.to_string())
        .map_err(application_error_to_response)
}

fn required_ip(params: IpParams) -> Result<String, Response> {
    let raw = params
        .ip
        .filter(|ip| !ip.trim().is_empty())
        .ok_or_else(|| bad_request("Missing required field 'ip'"))?;
    canonical_ip(&raw)
}

async fn audit(state: &GatewayState, kind: SecurityEventKind, ip: Option<&str>, detail: String) {
    state
        .events
        .emit(SecurityEvent::new(kind, detail).with_ip(ip))
        .await;
}

/// POST /admin/blocklist
pub async fn block_ip(
    State(state): State<GatewayState>,
    payload: Result<Json<BlockIpRequest>, JsonRejection>,
) -> Result<Response, Response> {
    let request = json_body(payload)?;
    let ip = canonical_ip(&request.ip)?;
    let entry = state
        .blocklist
        .block(&ip, request.ttl_seconds, request.reason)
        .await
        .map_err(application_error_to_response)?;

    let detail = match entry.expires_at {
        Some(expires_at) => format!("blocked until {}", expires_at.to_rfc3339()),
        None => "blocked permanently".to_string(),
    };
    audit(&state, SecurityEventKind::AdminAction, Some(&ip), detail).await;

    let body = BlocklistStatusResponse {
        ip,
        blocked: true,
        entry: Some(entry),
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// DELETE /admin/blocklist?ip=... (or `{ "ip": ... }` body)
pub async fn unblock_ip(
    State(state): State<GatewayState>,
    Query(query): Query<IpParams>,
    body: Bytes,
) -> Result<Json<UnblockResponse>, Response> {
    let params = if query.ip.is_some() {
        query
    } else {
        optional_json_body::<IpParams>(&body)?
    };
    let ip = required_ip(params)?;

    let removed = state
        .blocklist
        .unblock(&ip)
        .await
        .map_err(application_error_to_response)?;
    if removed {
        audit(
            &state,
            SecurityEventKind::AdminAction,
            Some(&ip),
            "unblocked".to_string(),
        )
        .await;
    }

    Ok(Json(UnblockResponse { ip, removed }))
}

/// GET /admin/blocklist?ip=...
pub async fn blocklist_status(
    State(state): State<GatewayState>,
    Query(query): Query<IpParams>,
) -> Result<Json<BlocklistStatusResponse>, Response> {
    let ip = required_ip(query)?;
    let entry = state
        .blocklist
        .entry(&ip)
        .await
        .map_err(application_error_to_response)?;

    Ok(Json(BlocklistStatusResponse {
        ip,
        blocked: entry.is_some(),
        entry,
    }))
}

/// GET /admin/kill-switch
pub async fn get_kill_switch(
    State(state): State<GatewayState>,
) -> Result<Json<KillSwitchResponse>, Response> {
    let enabled = state
        .kill_switch
        .read()
        .await
        .map_err(|e| application_error_to_response(ApplicationError::from(e)))?;
    Ok(Json(KillSwitchResponse { enabled }))
}

/// POST /admin/kill-switch
pub async fn set_kill_switch(
    State(state): State<GatewayState>,
    payload: Result<Json<KillSwitchRequest>, JsonRejection>,
) -> Result<Json<KillSwitchResponse>, Response> {
    let request = json_body(payload)?;
    state
        .kill_switch
        .set(request.enabled)
        .await
        .map_err(|e| application_error_to_response(ApplicationError::from(e)))?;

    let detail = if request.enabled {
        "kill switch enabled"
    } else {
        "kill switch disabled"
    };
    audit(&state, SecurityEventKind::KillSwitch, None, detail.to_string()).await;

    Ok(Json(KillSwitchResponse {
        enabled: request.enabled,
    }))
}

async fn traffic_mode_response(state: &GatewayState) -> Result<TrafficModeResponse, Response> {
    let mode = state
        .traffic
        .mode()
        .await
        .map_err(|e| application_error_to_response(ApplicationError::from(e)))?;
    let metrics = state.traffic.metrics().await;
    Ok(TrafficModeResponse {
        high: mode.high,
        expires_in_seconds: mode.expires_in_seconds,
        is_high_traffic: metrics.is_high_traffic,
        requests_per_second: metrics.requests_per_second,
    })
}

/// GET /admin/traffic-mode
pub async fn get_traffic_mode(
    State(state): State<GatewayState>,
) -> Result<Json<TrafficModeResponse>, Response> {
    traffic_mode_response(&state).await.map(Json)
}

/// POST /admin/traffic-mode
pub async fn set_traffic_mode(
    State(state): State<GatewayState>,
    payload: Result<Json<TrafficModeRequest>, JsonRejection>,
) -> Result<Json<TrafficModeResponse>, Response> {
    let request = json_body(payload)?;
    state
        .traffic
        .set_mode(request.high)
        .await
        .map_err(|e| application_error_to_response(ApplicationError::from(e)))?;

    let detail = if request.high {
        "high traffic mode forced on"
    } else {
        "high traffic override cleared"
    };
    audit(&state, SecurityEventKind::AdminAction, None, detail.to_string()).await;

    traffic_mode_response(&state).await.map(Json)
}

/// POST /admin/circuit-breaker/reset
pub async fn reset_circuit_breaker(State(state): State<GatewayState>) -> Json<CircuitBreakerDto> {
    state.circuit_breaker.reset().await;
    audit(
        &state,
        SecurityEventKind::AdminAction,
        None,
        "circuit breaker reset".to_string(),
    )
    .await;

    let config = state.circuit_breaker.config();
    Json(CircuitBreakerDto::new(
        state.circuit_breaker.snapshot().await,
        config.failure_threshold,
        config.reset_timeout.as_secs(),
    ))
}
