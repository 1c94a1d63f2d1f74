//! Application wiring: store, services, upstream proxy and router

use axum::Router;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use rampart_core::Config;
use rampart_core::infrastructure::store;
use rampart_gateway::{GatewayState, create_router};

use crate::proxy::{UpstreamProxy, forward};

/// Handle returned from create_app for graceful shutdown coordination
pub struct AppHandle {
    pub router: Router,
    pub state: GatewayState,
    pub shutdown_token: CancellationToken,
}

/// Create the application router and return an AppHandle for shutdown coordination
pub async fn create_app(
    config: Config,
) -> Result<AppHandle, Box<dyn std::error::Error + Send + Sync>> {
    let startup_time = Instant::now();
    let shutdown_token = CancellationToken::new();

    let shared_store = store::connect(&config.store).await;
    store::spawn_cleanup_task(
        shared_store.clone(),
        Duration::from_secs(config.store.cleanup_interval_seconds.max(1)),
        shutdown_token.clone(),
    );

    let upstream_config = config.upstream.clone();
    let state = GatewayState::new(config, shared_store);

    let proxy = UpstreamProxy::new(&upstream_config, state.circuit_breaker.clone())?;
    let application = Router::new().fallback(forward).with_state(proxy);
    let router = create_router(state.clone(), application);

    tracing::info!(
        upstream = %upstream_config.url,
        failure_policy = state.guard.policy().as_str(),
        rate_limiting = state.rate_limiter.is_enabled(),
        startup_ms = startup_time.elapsed().as_millis(),
        "Application initialised"
    );

    Ok(AppHandle {
        router,
        state,
        shutdown_token,
    })
}
