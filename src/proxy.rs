//! Reverse proxy to the protected application
//!
//! Upstream connection errors and 5xx answers count as datastore failures for
//! the circuit breaker; every other answer counts as a success.

use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use std::time::Duration;

use rampart_core::config::UpstreamConfig;
use rampart_core::infrastructure::CircuitBreaker;
use rampart_gateway::presentation::models::ErrorResponse;

/// Connection-scoped headers that must not be forwarded
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Clone)]
pub struct UpstreamProxy {
    client: reqwest::Client,
    base_url: Arc<str>,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl UpstreamProxy {
    pub fn new(
        config: &UpstreamConfig,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            base_url: Arc::from(config.url.trim_end_matches('/')),
            circuit_breaker,
        })
    }
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in HOP_BY_HOP.iter() {
        forwarded.remove(name);
    }
    forwarded.remove(header::HOST);
    forwarded
}

/// Forward the request upstream and relay the answer
pub async fn forward(State(proxy): State<UpstreamProxy>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", proxy.base_url, path_and_query);

    let mut upstream_request = proxy
        .client
        .request(parts.method.clone(), &url)
        .headers(forwardable(&parts.headers));
    if !body.is_end_stream() {
        upstream_request =
            upstream_request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    match upstream_request.send().await {
        Ok(upstream) => {
            let status = upstream.status();
            if status.is_server_error() {
                proxy.circuit_breaker.record_failure().await;
            } else {
                proxy.circuit_breaker.record_success().await;
            }

            let headers = forwardable(upstream.headers());
            let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
        Err(e) => {
            proxy.circuit_breaker.record_failure().await;
            tracing::warn!(
                method = %parts.method,
                url = %url,
                error = %e,
                "Upstream request failed"
            );
            let status = if e.is_timeout() {
                StatusCode::GATEWAY_TIMEOUT
            } else {
                StatusCode::BAD_GATEWAY
            };
            (
                status,
                Json(ErrorResponse::new(
                    "UPSTREAM_UNAVAILABLE",
                    "Upstream service did not answer",
                )),
            )
                .into_response()
        }
    }
}
