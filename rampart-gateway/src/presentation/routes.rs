//! Route definitions

use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::presentation::controllers::{
    GatewayState,
    admin::{
        block_ip, blocklist_status, get_kill_switch, get_traffic_mode, reset_circuit_breaker,
        set_kill_switch, set_traffic_mode, unblock_ip,
    },
    events::{list_security_events, stream_security_events},
    health::{health_check, metrics},
};
use crate::presentation::middleware::{
    admission_middleware, logging_middleware, require_admin_token, stale_cache_middleware,
};

/// Build the gateway router around `application`
///
/// `application` carries the protected routes (in the binary, the upstream
/// proxy). It is wrapped by the stale-response layer and, outside that, by
/// admission, so denials are never replaced by cached content. Health,
/// metrics and admin routes bypass admission so operators can still reach
/// them while the kill switch is on.
pub fn create_router(state: GatewayState, application: Router) -> Router {
    let admin_routes = Router::new()
        .route(
            "/blocklist",
            post(block_ip).delete(unblock_ip).get(blocklist_status),
        )
        .route("/kill-switch", get(get_kill_switch).post(set_kill_switch))
        .route(
            "/traffic-mode",
            get(get_traffic_mode).post(set_traffic_mode),
        )
        .route("/circuit-breaker/reset", post(reset_circuit_breaker))
        .route("/security/events", get(list_security_events))
        .route("/security/events/stream", get(stream_security_events));

    let operator_routes = Router::new()
        .route("/metrics", get(metrics))
        .nest("/admin", admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ))
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .with_state(state.clone());

    let protected = application
        .layer(middleware::from_fn_with_state(
            state.clone(),
            stale_cache_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ));

    let request_timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    Router::new()
        .merge(public_routes)
        .merge(operator_routes)
        .merge(protected)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}
