//! Error types shared across rampart-core

use crate::config::ValidationError;

/// Errors raised by the shared counter/cache store
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("corrupt value under key {key}: {message}")]
    Corrupt { key: String, message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn corrupt(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(error: redis::RedisError) -> Self {
        StoreError::Unavailable(error.to_string())
    }
}

/// Application-level error
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid {field}: {message}")]
    InvalidInput { field: &'static str, message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ValidationError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Service unavailable: {reason}")]
    ServiceUnavailable { reason: String },
}

impl ApplicationError {
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }
}
