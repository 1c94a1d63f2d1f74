//! Rate Limiter Service
//!
//! Applies the named policies to fingerprints on top of the shared store.

use std::sync::Arc;
use tracing::debug;

use super::types::{RateLimitPolicy, RateLimitResult, current_time_millis};
use super::window::SlidingWindow;
use crate::config::{PolicyLimitConfig, RateLimitConfig};
use crate::domain::Fingerprint;
use crate::infrastructure::resilience::StoreGuard;
use crate::infrastructure::store::SharedStore;

/// Main rate limiter service
pub struct RateLimiterService {
    window: SlidingWindow,
    guard: StoreGuard,
    config: RateLimitConfig,
}

impl RateLimiterService {
    pub fn new(store: Arc<dyn SharedStore>, config: RateLimitConfig, guard: StoreGuard) -> Self {
        Self {
            window: SlidingWindow::new(store, config.algorithm),
            guard,
            config,
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Configured limit for a policy
    pub fn policy_limit(&self, policy: RateLimitPolicy) -> PolicyLimitConfig {
        match policy {
            RateLimitPolicy::Api => self.config.api,
            RateLimitPolicy::Auth => self.config.auth,
            RateLimitPolicy::Bot => self.config.bot,
        }
    }

    /// Count a request for `fingerprint` against `policy`
    ///
    /// Never fails: when the store cannot answer in time the configured
    /// failure policy decides, and an open policy reports `limit = -1`.
    pub async fn check_rate_limit(
        &self,
        fingerprint: &Fingerprint,
        policy: RateLimitPolicy,
    ) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::unenforced(policy);
        }

        let limits = self.policy_limit(policy);
        let key = policy.key(fingerprint);

        let hit = match self
            .guard
            .run("rate_limit", self.window.hit(&key, limits.window()))
            .await
        {
            Ok(hit) => hit,
            Err(_) => {
                let reset_at = current_time_millis() + limits.window().as_millis() as u64;
                return self.guard.policy().resolve(
                    RateLimitResult::unenforced(policy),
                    RateLimitResult::exceeded(policy, limits.limit, reset_at),
                );
            }
        };

        let limit = limits.limit as u64;
        if hit.count > limit {
            debug!(
                fingerprint = %fingerprint,
                policy = %policy,
                count = hit.count,
                limit = limit,
                "Rate limit exceeded"
            );
            return RateLimitResult::exceeded(policy, limits.limit, hit.reset_at);
        }

        let remaining = (limit - hit.count) as u32;
        RateLimitResult::allowed(policy, limits.limit, remaining, hit.reset_at)
    }
}
