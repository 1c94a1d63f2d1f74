//! Rate limiter types and core data structures

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::domain::{Fingerprint, RouteClass};

/// Named rate limit policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitPolicy {
    /// General API traffic - 120 requests per minute by default
    Api,
    /// Auth endpoints - 5 attempts per 15 minutes by default
    Auth,
    /// Flagged bots - 10 requests per hour by default
    Bot,
}

impl RateLimitPolicy {
    /// Get the policy name for logging and keys
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitPolicy::Api => "api",
            RateLimitPolicy::Auth => "auth",
            RateLimitPolicy::Bot => "bot",
        }
    }

    /// Store key for a fingerprint under this policy
    pub fn key(&self, fingerprint: &Fingerprint) -> String {
        format!("ratelimit:{}:{}", self.as_str(), fingerprint)
    }
}

impl std::fmt::Display for RateLimitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<RouteClass> for RateLimitPolicy {
    fn from(class: RouteClass) -> Self {
        match class {
            RouteClass::Api => RateLimitPolicy::Api,
            RouteClass::Auth => RateLimitPolicy::Auth,
            RouteClass::Bot => RateLimitPolicy::Bot,
        }
    }
}

/// Limit reported when the limiter could not enforce anything
pub const UNENFORCED_LIMIT: i64 = -1;

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub success: bool,
    /// Maximum requests in the window; [`UNENFORCED_LIMIT`] when the store failed open
    pub limit: i64,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Unix timestamp in milliseconds when the window resets
    pub reset_at: u64,
    /// The policy that was applied
    pub policy: RateLimitPolicy,
}

impl RateLimitResult {
    pub fn allowed(policy: RateLimitPolicy, limit: u32, remaining: u32, reset_at: u64) -> Self {
        Self {
            success: true,
            limit: limit as i64,
            remaining,
            reset_at,
            policy,
        }
    }

    pub fn exceeded(policy: RateLimitPolicy, limit: u32, reset_at: u64) -> Self {
        Self {
            success: false,
            limit: limit as i64,
            remaining: 0,
            reset_at,
            policy,
        }
    }

    /// Allowed without enforcement (store unavailable or limiter disabled)
    pub fn unenforced(policy: RateLimitPolicy) -> Self {
        Self {
            success: true,
            limit: UNENFORCED_LIMIT,
            remaining: 0,
            reset_at: 0,
            policy,
        }
    }

    pub fn is_enforced(&self) -> bool {
        self.limit != UNENFORCED_LIMIT
    }

    /// Whole seconds until the window resets, at least 1
    pub fn retry_after_secs(&self) -> u64 {
        let now = current_time_millis();
        self.reset_at.saturating_sub(now).div_ceil(1000).max(1)
    }
}

/// Get current time in milliseconds since Unix epoch
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Get current time in seconds since Unix epoch
pub fn current_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_key() {
        let fp = Fingerprint::for_ip(Some("192.168.1.1"));
        assert_eq!(RateLimitPolicy::Auth.key(&fp), "ratelimit:auth:192.168.1.1");
    }

    #[test]
    fn test_route_class_maps_to_policy() {
        assert_eq!(RateLimitPolicy::from(RouteClass::Bot), RateLimitPolicy::Bot);
        assert_eq!(RateLimitPolicy::from(RouteClass::Api), RateLimitPolicy::Api);
    }

    #[test]
    fn test_unenforced_result() {
        let result = RateLimitResult::unenforced(RateLimitPolicy::Api);
        assert!(result.success);
        assert_eq!(result.limit, -1);
        assert!(!result.is_enforced());
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let result =
            RateLimitResult::exceeded(RateLimitPolicy::Api, 10, current_time_millis() + 1_500);
        let retry = result.retry_after_secs();
        assert!((1..=2).contains(&retry));

        let past = RateLimitResult::exceeded(RateLimitPolicy::Api, 10, 0);
        assert_eq!(past.retry_after_secs(), 1);
    }
}
