//! Admission middleware
//!
//! Builds an admission request from the incoming HTTP request (client IP,
//! route class, bot verdict), asks the admission service for a verdict and
//! either forwards the request or answers with the matching error status.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use ipnet::IpNet;
use std::net::{IpAddr, SocketAddr};

use rampart_core::application::AdmissionDecision;
use rampart_core::config::GatewayConfig;
use rampart_core::domain::{AdmissionRequest, DenyReason, Fingerprint, RequestProfile, RouteClass};
use rampart_core::infrastructure::RateLimitResult;
use rampart_core::infrastructure::rate_limiter::types::current_time_millis;

use crate::presentation::controllers::GatewayState;
use crate::presentation::middleware::error_response;
use crate::presentation::models::ErrorResponse;

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let first_hop = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next());
    let real_ip = headers.get("x-real-ip").and_then(|h| h.to_str().ok());

    [first_hop, real_ip]
        .into_iter()
        .flatten()
        .find_map(|candidate| candidate.trim().parse::<IpAddr>().ok())
}

/// Client IP for fingerprinting and blocklist checks
///
/// The socket peer is authoritative. Forwarded headers replace it only when
/// the peer itself is one of `trusted_proxies`; without a known peer they are
/// never honoured.
pub fn extract_ip(request: &Request, trusted_proxies: &[IpNet]) -> Option<String> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())?;

    let headers = request.headers();
    if trusted_proxies.iter().any(|net| net.contains(&peer)) {
        if let Some(client) = forwarded_ip(headers) {
            return Some(client.to_string());
        }
    } else if headers.contains_key("x-forwarded-for") || headers.contains_key("x-real-ip") {
        tracing::debug!(peer = %peer, "Ignoring forwarded headers from untrusted peer");
    }

    Some(peer.to_string())
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Header bag handed to the bot scorer
pub fn request_profile(request: &Request, ip: Option<&str>) -> RequestProfile {
    let headers = request.headers();
    RequestProfile {
        method: request.method().as_str().to_string(),
        user_agent: header_string(headers, header::USER_AGENT),
        referer: header_string(headers, header::REFERER),
        accept: header_string(headers, header::ACCEPT),
        accept_language: header_string(headers, header::ACCEPT_LANGUAGE),
        accept_encoding: header_string(headers, header::ACCEPT_ENCODING),
        ip: ip.and_then(|ip| ip.parse::<IpAddr>().ok()),
    }
}

fn matches_prefix(prefixes: &[String], path: &str) -> bool {
    prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && path.starts_with(prefix.as_str()))
}

/// Route class before the bot verdict is applied
pub fn route_class(config: &GatewayConfig, path: &str) -> RouteClass {
    if matches_prefix(&config.auth_paths, path) {
        RouteClass::Auth
    } else {
        RouteClass::Api
    }
}

/// Gate every request through the admission service
pub async fn admission_middleware(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Response {
    let gateway = &state.config.gateway;
    let path = request.uri().path().to_string();
    if matches_prefix(&gateway.exempt_paths, &path) {
        return next.run(request).await;
    }

    let ip = extract_ip(&request, &gateway.trusted_proxies);
    let verdict = state.bot_scorer.score(&request_profile(&request, ip.as_deref()));

    let mut admission = AdmissionRequest::new(
        Fingerprint::for_ip(ip.as_deref()),
        route_class(gateway, &path),
        request.method().as_str(),
    )
    .with_path(path)
    .with_bot_verdict(verdict);
    if let Some(ip) = ip {
        admission = admission.with_ip(ip);
    }

    let decision = state.admission.decide(&admission).await;
    if !decision.allow {
        tracing::info!(
            fingerprint = %admission.fingerprint,
            method = %admission.method,
            path = admission.path.as_deref().unwrap_or(""),
            reason = decision.reason.map(|r| r.as_str()).unwrap_or(""),
            "Request denied"
        );
        return deny_response(&decision);
    }

    let mut response = next.run(request).await;
    if let Some(rate_limit) = decision.rate_limit.as_ref() {
        add_rate_limit_headers(response.headers_mut(), rate_limit);
    }
    response
}

/// Map a denial to its HTTP response
pub fn deny_response(decision: &AdmissionDecision) -> Response {
    let reason = decision.reason.unwrap_or(DenyReason::KillSwitch);
    let reason_details = serde_json::json!({ "reason": reason.as_str() });

    let (status, body) = match reason {
        DenyReason::KillSwitch => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorResponse::new(
                "SERVICE_DISABLED",
                "Service is temporarily disabled by an operator",
            )
            .with_details(reason_details),
        ),
        DenyReason::Blocked => (
            StatusCode::FORBIDDEN,
            ErrorResponse::new("FORBIDDEN", "Access denied").with_details(reason_details),
        ),
        DenyReason::RateLimited => {
            let body = match decision.rate_limit.as_ref() {
                Some(rl) => {
                    let retry_after = rl.retry_after_secs();
                    ErrorResponse::new(
                        "RATE_LIMIT_EXCEEDED",
                        format!(
                            "Rate limit exceeded. Please retry after {} seconds.",
                            retry_after
                        ),
                    )
                    .with_details(serde_json::json!({
                        "reason": reason.as_str(),
                        "policy": rl.policy.as_str(),
                        "limit": rl.limit,
                        "remaining": rl.remaining,
                        "retry_after": retry_after,
                    }))
                }
                None => ErrorResponse::new("RATE_LIMIT_EXCEEDED", "Rate limit exceeded")
                    .with_details(reason_details),
            };
            (StatusCode::TOO_MANY_REQUESTS, body)
        }
        DenyReason::CircuitOpen => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorResponse::new(
                "CIRCUIT_OPEN",
                "Write operations are temporarily unavailable",
            )
            .with_details(reason_details),
        ),
    };

    let mut response = error_response(status, body);
    if let Some(rl) = decision.rate_limit.as_ref() {
        add_rate_limit_headers(response.headers_mut(), rl);
        if reason == DenyReason::RateLimited {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(rl.retry_after_secs()));
        }
    }
    response
}

/// Standard `RateLimit-*` headers; nothing is added when the limiter did not enforce
pub fn add_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    if !result.is_enforced() {
        return;
    }
    let reset_secs = result
        .reset_at
        .saturating_sub(current_time_millis())
        .div_ceil(1000);

    headers.insert("ratelimit-limit", HeaderValue::from(result.limit));
    headers.insert("ratelimit-remaining", HeaderValue::from(result.remaining));
    headers.insert("ratelimit-reset", HeaderValue::from(reset_secs));
    headers.insert(
        "ratelimit-policy",
        HeaderValue::from_static(result.policy.as_str()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(headers: &[(&str, &str)]) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/posts");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn from_peer(peer: [u8; 4], headers: &[(&str, &str)]) -> Request {
        let mut req = request(headers);
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 4000))));
        req
    }

    fn proxies(nets: &[&str]) -> Vec<IpNet> {
        nets.iter().map(|n| n.parse().unwrap()).collect()
    }

    #[test]
    fn test_trusted_proxy_forwards_first_hop() {
        let req = from_peer(
            [10, 0, 0, 5],
            &[
                ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
                ("x-real-ip", "198.51.100.2"),
            ],
        );
        let trusted = proxies(&["10.0.0.0/8"]);
        assert_eq!(extract_ip(&req, &trusted).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_trusted_proxy_falls_back_to_real_ip() {
        let req = from_peer([127, 0, 0, 1], &[("x-real-ip", "198.51.100.2")]);
        let trusted = proxies(&["127.0.0.1/32"]);
        assert_eq!(extract_ip(&req, &trusted).as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn test_spoofed_header_from_untrusted_peer_is_ignored() {
        let req = from_peer([198, 51, 100, 66], &[("x-forwarded-for", "1.1.1.1")]);
        let trusted = proxies(&["10.0.0.0/8"]);
        assert_eq!(extract_ip(&req, &trusted).as_deref(), Some("198.51.100.66"));
        assert_eq!(extract_ip(&req, &[]).as_deref(), Some("198.51.100.66"));
    }

    #[test]
    fn test_unparseable_forwarded_value_keeps_peer() {
        let req = from_peer([10, 0, 0, 5], &[("x-forwarded-for", "not-an-ip")]);
        let trusted = proxies(&["10.0.0.0/8"]);
        assert_eq!(extract_ip(&req, &trusted).as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_headers_without_peer_are_not_trusted() {
        let req = request(&[("x-forwarded-for", "203.0.113.7")]);
        assert_eq!(extract_ip(&req, &proxies(&["0.0.0.0/0"])), None);
    }

    #[test]
    fn test_route_class_by_prefix() {
        let config = GatewayConfig::default();
        assert_eq!(route_class(&config, "/api/auth/login"), RouteClass::Auth);
        assert_eq!(route_class(&config, "/login"), RouteClass::Auth);
        assert_eq!(route_class(&config, "/api/posts"), RouteClass::Api);
    }

    #[test]
    fn test_request_profile_reads_headers() {
        let req = request(&[
            ("user-agent", "curl/8.0"),
            ("accept", "*/*"),
        ]);
        let profile = request_profile(&req, Some("203.0.113.7"));
        assert_eq!(profile.method, "GET");
        assert_eq!(profile.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(profile.accept.as_deref(), Some("*/*"));
        assert!(profile.accept_language.is_none());
        assert!(profile.ip.is_some());
    }
}
