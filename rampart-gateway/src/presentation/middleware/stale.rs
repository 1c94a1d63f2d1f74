//! Stale-response middleware for GET requests
//!
//! Successful bodies are remembered per path and query. While the system is
//! degraded, a failed response is replaced by the remembered one and tagged
//! `x-cache-status: stale`.

use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header, response::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};

use crate::presentation::controllers::GatewayState;

pub const CACHE_STATUS_HEADER: &str = "x-cache-status";

/// What is kept for a cached response
#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    #[serde(default)]
    content_type: Option<String>,
    body: String,
}

fn cache_key(request: &Request) -> String {
    request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

fn declared_length(headers: &HeaderMap, body: &Body) -> Option<u64> {
    body.size_hint().exact().or_else(|| {
        headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    })
}

fn with_status(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status));
    response
}

/// Remember successful GET responses and replay them while degraded
pub async fn stale_cache_middleware(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET || !state.fallback.cache().is_enabled() {
        return next.run(request).await;
    }

    let key = cache_key(&request);
    let response = next.run(request).await;

    if response.status().is_success() {
        let max_body_bytes = state.config.stale_cache.max_body_bytes;
        let response = remember(&state, &key, response, max_body_bytes).await;
        return with_status(response, "fresh");
    }

    match state.fallback.stale_payload(&key).await {
        Some(payload) => match serde_json::from_str::<CachedResponse>(&payload) {
            Ok(cached) => {
                tracing::info!(
                    key = %key,
                    upstream_status = %response.status(),
                    "Serving stale response"
                );
                stale_response(cached)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable stale entry");
                response
            }
        },
        None => response,
    }
}

/// Buffer a small UTF-8 body, store it and rebuild the response
async fn remember(
    state: &GatewayState,
    key: &str,
    response: Response,
    max_body_bytes: usize,
) -> Response {
    let (parts, body) = response.into_parts();
    let cacheable = declared_length(&parts.headers, &body)
        .is_some_and(|len| len <= max_body_bytes as u64);
    if !cacheable {
        return Response::from_parts(parts, body);
    }

    let bytes = match axum::body::to_bytes(body, max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to buffer response body");
            return body_lost(parts);
        }
    };

    if let Ok(text) = std::str::from_utf8(&bytes) {
        let cached = CachedResponse {
            content_type: parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: text.to_string(),
        };
        match serde_json::to_string(&cached) {
            Ok(payload) => state.fallback.remember(key, &payload).await,
            Err(e) => tracing::debug!(key = %key, error = %e, "Response is not cacheable"),
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}

fn stale_response(cached: CachedResponse) -> Response {
    let mut response = Response::new(Body::from(cached.body));
    if let Some(content_type) = cached
        .content_type
        .and_then(|ct| HeaderValue::from_str(&ct).ok())
    {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    with_status(response, "stale")
}

fn body_lost(mut parts: Parts) -> Response {
    parts.status = StatusCode::BAD_GATEWAY;
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::empty())
}
