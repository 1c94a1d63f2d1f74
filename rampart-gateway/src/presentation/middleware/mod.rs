//! HTTP middleware for the gateway

pub mod admission;
pub mod auth;
pub mod stale;

pub use admission::{admission_middleware, extract_ip};
pub use auth::require_admin_token;
pub use stale::stale_cache_middleware;

use axum::{
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::time::Instant;
use uuid::Uuid;

use rampart_core::application::errors::{ApplicationError, StoreError};

use crate::presentation::models::ErrorResponse;

/// Convert ApplicationError to HTTP response
pub fn application_error_to_response(error: ApplicationError) -> Response {
    // Handlers do not see the environment config; fall back to the ENV variable
    let sanitize_errors = std::env::var("ENV").unwrap_or_default() == "production";

    let (status, code, message) = match &error {
        ApplicationError::InvalidInput { .. } => (
            StatusCode::BAD_REQUEST,
            "INVALID_INPUT",
            "Invalid input provided",
        ),
        ApplicationError::Store(StoreError::Timeout { .. }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "STORE_TIMEOUT",
            "Shared store did not respond in time",
        ),
        ApplicationError::Store(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "STORE_UNAVAILABLE",
            "Shared store is unavailable",
        ),
        ApplicationError::ServiceUnavailable { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Service temporarily unavailable",
        ),
        ApplicationError::Configuration(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "CONFIGURATION_ERROR",
            if sanitize_errors {
                "Service temporarily unavailable"
            } else {
                "Service configuration error"
            },
        ),
        ApplicationError::Json(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            if sanitize_errors {
                "An internal error occurred"
            } else {
                "Internal server error"
            },
        ),
    };

    // 4xx = client errors (warn level), 5xx = server errors (error level)
    if status.is_server_error() {
        tracing::error!(
            error = %error,
            http_status = %status,
            error_code = code,
            "Server error mapped to HTTP response"
        );
    } else {
        tracing::warn!(
            error = %error,
            http_status = %status,
            error_code = code,
            "Client error mapped to HTTP response"
        );
    }

    let mut body = ErrorResponse::new(code, message);
    if !sanitize_errors {
        body = body.with_details(serde_json::json!({ "error": error.to_string() }));
    }

    (status, Json(body)).into_response()
}

/// Shorthand for error responses built outside the ApplicationError mapping
pub fn error_response(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}

/// Request logging middleware with timing and request ID
pub async fn logging_middleware(request: Request, next: axum::middleware::Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = Uuid::new_v4();
    let start_time = Instant::now();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        "Processing request"
    );

    let response = next.run(request).await;
    let duration = start_time.elapsed();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}
