//! Bearer token check for the admin and metrics surface

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::presentation::controllers::GatewayState;
use crate::presentation::middleware::error_response;
use crate::presentation::models::ErrorResponse;

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().strip_prefix("Bearer "))
        .map(str::trim)
}

/// Compare in constant time; lengths leak, contents do not
pub fn token_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Reject requests without the configured admin bearer token
pub async fn require_admin_token(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state
        .config
        .admin
        .bearer_token
        .as_deref()
        .filter(|t| !t.is_empty())
    else {
        tracing::warn!(
            uri = %request.uri(),
            "Admin request rejected: no admin bearer token configured"
        );
        return error_response(
            StatusCode::UNAUTHORIZED,
            ErrorResponse::new("ADMIN_DISABLED", "Admin API is not configured"),
        );
    };

    let authorized = bearer_token(&request).map(|provided| token_matches(provided, expected));
    if authorized == Some(true) {
        return next.run(request).await;
    }

    tracing::warn!(
        uri = %request.uri(),
        token_present = authorized.is_some(),
        "Admin request rejected: invalid bearer token"
    );
    error_response(
        StatusCode::UNAUTHORIZED,
        ErrorResponse::new("UNAUTHORIZED", "Missing or invalid bearer token"),
    )
}
