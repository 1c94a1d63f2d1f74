//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub resilience: ResilienceConfig,
    pub rate_limit: RateLimitConfig,
    pub bot_detection: BotDetectionConfig,
    pub blocklist: BlocklistConfig,
    pub circuit_breaker: CircuitBreakerConfigSerializable,
    pub traffic: TrafficConfig,
    pub stale_cache: StaleCacheConfig,
    pub events: EventsConfig,
    pub admin: AdminConfig,
    pub gateway: GatewayConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
    /// Grace period for background tasks on shutdown
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_seconds: 30,
            shutdown_timeout_seconds: 5,
        }
    }
}

/// Storage backend for counters, blocklist and caches
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Redis or Dragonfly, shared between instances (recommended for production)
    #[default]
    Redis,
    /// Process-local memory (development/single instance)
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: String,
    /// Interval of the expired-entry sweep for the in-memory backend
    pub cleanup_interval_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            url: "redis://127.0.0.1:6379".to_string(),
            cleanup_interval_seconds: 60,
        }
    }
}

/// What to decide when a supporting store cannot answer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Let the request through (availability over enforcement)
    #[default]
    Open,
    /// Treat the check as failed (enforcement over availability)
    Closed,
}

impl FailurePolicy {
    /// Pick the value matching this policy
    pub fn resolve<T>(self, open: T, closed: T) -> T {
        match self {
            FailurePolicy::Open => open,
            FailurePolicy::Closed => closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Open => "open",
            FailurePolicy::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub store_failure_policy: FailurePolicy,
    /// Upper bound for a single store round trip on the admission path
    pub store_timeout_ms: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            store_failure_policy: FailurePolicy::Open,
            store_timeout_ms: 250,
        }
    }
}

impl ResilienceConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Counting algorithm used by the rate limiter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WindowAlgorithm {
    /// Window anchored on the fingerprint's first request, expiring after one window
    #[default]
    Rolling,
    /// Two-bucket sliding counter weighting the previous bucket
    Weighted,
}

/// Limit for a single rate limit policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyLimitConfig {
    pub limit: u32,
    pub window_seconds: u64,
}

impl PolicyLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub algorithm: WindowAlgorithm,
    /// General API traffic
    pub api: PolicyLimitConfig,
    /// Login/registration and other credential endpoints
    pub auth: PolicyLimitConfig,
    /// Requests flagged by the bot scorer
    pub bot: PolicyLimitConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: WindowAlgorithm::Rolling,
            api: PolicyLimitConfig {
                limit: 120,
                window_seconds: 60,
            },
            auth: PolicyLimitConfig {
                limit: 5,
                window_seconds: 15 * 60,
            },
            bot: PolicyLimitConfig {
                limit: 10,
                window_seconds: 3600,
            },
        }
    }
}

/// Additive weights for the bot heuristics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotWeights {
    pub suspicious_user_agent: u8,
    pub non_browser_user_agent: u8,
    pub missing_accept: u8,
    pub missing_accept_language: u8,
    pub missing_accept_encoding: u8,
    pub datacenter_ip: u8,
    pub post_without_referer: u8,
    pub non_html_accept: u8,
}

impl Default for BotWeights {
    fn default() -> Self {
        Self {
            suspicious_user_agent: 40,
            non_browser_user_agent: 30,
            missing_accept: 15,
            missing_accept_language: 10,
            missing_accept_encoding: 10,
            datacenter_ip: 20,
            post_without_referer: 15,
            non_html_accept: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotDetectionConfig {
    pub enabled: bool,
    /// Score at or above which a request is treated as a bot
    pub threshold: u8,
    pub weights: BotWeights,
    /// Lowercase substrings that mark automation clients
    pub suspicious_agents: Vec<String>,
    /// User agents shorter than this without a browser token count as non-browser
    pub min_browser_agent_length: usize,
    /// Hosting/VPS ranges
    pub datacenter_ranges: Vec<IpNet>,
}

impl Default for BotDetectionConfig {
    fn default() -> Self {
        let agents = [
            "bot", "crawler", "spider", "scraper", "curl", "wget", "python-requests",
            "python-urllib", "aiohttp", "httpx", "go-http-client", "java/", "okhttp",
            "libwww-perl", "node-fetch", "axios", "headlesschrome", "phantomjs", "selenium",
            "puppeteer", "playwright", "scrapy",
        ];
        let ranges = [
            "104.131.0.0/16", // DigitalOcean
            "159.203.0.0/16", // DigitalOcean
            "5.9.0.0/16",     // Hetzner
            "51.38.0.0/16",   // OVH
            "45.33.0.0/17",   // Linode
        ];
        Self {
            enabled: true,
            threshold: 50,
            weights: BotWeights::default(),
            suspicious_agents: agents.iter().map(|s| s.to_string()).collect(),
            min_browser_agent_length: 40,
            datacenter_ranges: ranges.iter().filter_map(|r| r.parse().ok()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BlocklistConfig {
    /// Expiry applied when an admin block omits one; `None` blocks permanently
    pub default_ttl_seconds: Option<u64>,
}

/// Circuit breaker configuration (serializable version)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfigSerializable {
    /// Cumulative failures that open the circuit
    pub failure_threshold: u32,
    /// Quiet period since the last failure before a success may close it (seconds)
    pub reset_timeout_seconds: u64,
}

impl Default for CircuitBreakerConfigSerializable {
    fn default() -> Self {
        Self {
            failure_threshold: 10,
            reset_timeout_seconds: 60,
        }
    }
}

impl CircuitBreakerConfigSerializable {
    /// Convert to the runtime CircuitBreakerConfig
    pub fn to_circuit_breaker_config(
        &self,
    ) -> crate::infrastructure::resilience::CircuitBreakerConfig {
        crate::infrastructure::resilience::CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: Duration::from_secs(self.reset_timeout_seconds),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Requests per second above which the system is in high-traffic mode
    pub high_threshold: u64,
    /// Requests per second above which stale responses should be served
    pub critical_threshold: u64,
    /// Lifetime of a per-second bucket
    pub bucket_ttl_seconds: u64,
    /// Lifetime of the manual high-traffic override
    pub mode_ttl_seconds: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            high_threshold: 500,
            critical_threshold: 1000,
            bucket_ttl_seconds: 2,
            mode_ttl_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaleCacheConfig {
    pub enabled: bool,
    /// How long a last-known-good response stays available
    pub ttl_seconds: u64,
    /// Largest response body the gateway will remember
    pub max_body_bytes: usize,
}

impl Default for StaleCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 24 * 3600,
            max_body_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Capacity of the security event list
    pub max_entries: usize,
    /// Events sent in the initial snapshot of the live stream
    pub snapshot_size: usize,
    pub poll_interval_ms: u64,
    pub heartbeat_seconds: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            snapshot_size: 50,
            poll_interval_ms: 2000,
            heartbeat_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token for the admin and metrics endpoints; unset disables them
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Path prefixes rate limited with the auth policy
    pub auth_paths: Vec<String>,
    /// Path prefixes that skip admission entirely
    pub exempt_paths: Vec<String>,
    /// Reverse proxies whose X-Forwarded-For / X-Real-IP headers are honoured.
    /// Forwarded headers from any other peer are ignored; empty trusts nobody.
    pub trusted_proxies: Vec<IpNet>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            auth_paths: vec![
                "/api/auth".to_string(),
                "/login".to_string(),
                "/register".to_string(),
            ],
            exempt_paths: vec!["/favicon.ico".to_string(), "/robots.txt".to_string()],
            trusted_proxies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin that admitted requests are forwarded to
    pub url: String,
    pub timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000".to_string(),
            timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.store.validate()?;
        self.resilience.validate()?;
        self.rate_limit.validate()?;
        self.bot_detection.validate()?;
        self.circuit_breaker.validate()?;
        self.traffic.validate()?;
        self.events.validate()?;
        self.upstream.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("RAMPART")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("gateway.auth_paths")
                    .with_list_parse_key("gateway.exempt_paths")
                    .with_list_parse_key("bot_detection.suspicious_agents")
                    .with_list_parse_key("bot_detection.datacenter_ranges")
                    .with_list_parse_key("gateway.trusted_proxies")
                    .try_parsing(true),
            );

        let mut config: Config = builder.build()?.try_deserialize()?;

        // REDIS_URL is the common convention for hosted Redis
        if let Ok(url) = std::env::var("REDIS_URL") {
            config.store.url = url;
        }

        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
