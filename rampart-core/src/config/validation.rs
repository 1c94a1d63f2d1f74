//! Configuration validation module

use crate::config::{
    BotDetectionConfig, CircuitBreakerConfigSerializable, EventsConfig, LoggingConfig,
    PolicyLimitConfig, RateLimitConfig, ResilienceConfig, ServerConfig, StoreBackend, StoreConfig,
    TrafficConfig, UpstreamConfig,
};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Store configuration error: {message}")]
    Store { message: String },

    #[error("Rate limit configuration error: {message}")]
    RateLimit { message: String },

    #[error("Bot detection configuration error: {message}")]
    BotDetection { message: String },

    #[error("Circuit breaker configuration error: {message}")]
    CircuitBreaker { message: String },

    #[error("Traffic configuration error: {message}")]
    Traffic { message: String },

    #[error("Upstream configuration error: {message}")]
    Upstream { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    pub fn bot_detection(message: impl Into<String>) -> Self {
        Self::BotDetection {
            message: message.into(),
        }
    }

    pub fn circuit_breaker(message: impl Into<String>) -> Self {
        Self::CircuitBreaker {
            message: message.into(),
        }
    }

    pub fn traffic(message: impl Into<String>) -> Self {
        Self::Traffic {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // u16 cannot exceed 65535, so only 0 is out of range
        if self.port == 0 {
            return Err(ValidationError::server(format!(
                "Port must be in range 1-65535, got {}",
                self.port
            )));
        }

        if self.host.is_empty() {
            return Err(ValidationError::server("Host cannot be empty"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ValidationError::server(
                "Request timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.backend == StoreBackend::Redis
            && !self.url.starts_with("redis://")
            && !self.url.starts_with("rediss://")
        {
            return Err(ValidationError::store(format!(
                "Store url must start with redis:// or rediss://, got: {}",
                self.url
            )));
        }

        if self.cleanup_interval_seconds == 0 {
            return Err(ValidationError::store(
                "cleanup_interval_seconds must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for ResilienceConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.store_timeout_ms == 0 {
            return Err(ValidationError::store(
                "store_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn validate_policy(name: &str, policy: &PolicyLimitConfig) -> Result<(), ValidationError> {
    if policy.limit == 0 {
        return Err(ValidationError::rate_limit(format!(
            "{} limit must be greater than 0",
            name
        )));
    }
    if policy.window_seconds == 0 {
        return Err(ValidationError::rate_limit(format!(
            "{} window_seconds must be greater than 0",
            name
        )));
    }
    Ok(())
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_policy("api", &self.api)?;
        validate_policy("auth", &self.auth)?;
        validate_policy("bot", &self.bot)?;
        Ok(())
    }
}

impl Validate for BotDetectionConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.threshold == 0 || self.threshold > 100 {
            return Err(ValidationError::bot_detection(format!(
                "threshold must be between 1 and 100, got {}",
                self.threshold
            )));
        }

        if self.suspicious_agents.iter().any(|a| a.trim().is_empty()) {
            return Err(ValidationError::bot_detection(
                "suspicious_agents cannot contain empty entries",
            ));
        }

        Ok(())
    }
}

impl Validate for CircuitBreakerConfigSerializable {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.failure_threshold == 0 {
            return Err(ValidationError::circuit_breaker(
                "failure_threshold must be greater than 0",
            ));
        }
        if self.reset_timeout_seconds == 0 {
            return Err(ValidationError::circuit_breaker(
                "reset_timeout_seconds must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Validate for TrafficConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.high_threshold == 0 {
            return Err(ValidationError::traffic(
                "high_threshold must be greater than 0",
            ));
        }

        if self.critical_threshold <= self.high_threshold {
            return Err(ValidationError::traffic(format!(
                "critical_threshold ({}) must be greater than high_threshold ({})",
                self.critical_threshold, self.high_threshold
            )));
        }

        if self.bucket_ttl_seconds == 0 || self.mode_ttl_seconds == 0 {
            return Err(ValidationError::traffic(
                "bucket_ttl_seconds and mode_ttl_seconds must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for EventsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_entries == 0 {
            return Err(ValidationError::server(
                "events.max_entries must be greater than 0",
            ));
        }
        if self.poll_interval_ms == 0 || self.heartbeat_seconds == 0 {
            return Err(ValidationError::server(
                "events.poll_interval_ms and events.heartbeat_seconds must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Validate for UpstreamConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(ValidationError::upstream(format!(
                "Upstream url must start with http:// or https://, got: {}",
                self.url
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(ValidationError::upstream(
                "Upstream timeout must be greater than 0 seconds",
            ));
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !matches!(self.format.to_lowercase().as_str(), "json" | "pretty") {
            return Err(ValidationError::logging(format!(
                "Invalid log format: {}. Must be one of: json, pretty",
                self.format
            )));
        }
        Ok(())
    }
}
