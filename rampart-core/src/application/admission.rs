//! Request admission
//!
//! Checks run cheapest and most authoritative first:
//! 1. kill switch
//! 2. blocklist
//! 3. rate limit for the route class
//! 4. circuit breaker, for mutating methods only
//!
//! The first failing check decides; later checks do not run.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{AdmissionRequest, DenyReason, SecurityEvent, SecurityEventKind};
use crate::infrastructure::{
    BlocklistService, CircuitBreaker, KillSwitch, RateLimitPolicy, RateLimitResult,
    RateLimiterService, SecurityEventLog, TrafficMonitor,
};

/// Verdict for a single request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionDecision {
    pub allow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
    /// Rate limit state when the limiter ran
    #[serde(skip)]
    pub rate_limit: Option<RateLimitResult>,
}

impl AdmissionDecision {
    pub fn admit(rate_limit: Option<RateLimitResult>) -> Self {
        Self {
            allow: true,
            reason: None,
            rate_limit,
        }
    }

    pub fn deny(reason: DenyReason, rate_limit: Option<RateLimitResult>) -> Self {
        Self {
            allow: false,
            reason: Some(reason),
            rate_limit,
        }
    }
}

pub struct AdmissionService {
    kill_switch: Arc<KillSwitch>,
    blocklist: Arc<BlocklistService>,
    rate_limiter: Arc<RateLimiterService>,
    circuit_breaker: Arc<CircuitBreaker>,
    traffic: Arc<TrafficMonitor>,
    events: Arc<SecurityEventLog>,
}

impl AdmissionService {
    pub fn new(
        kill_switch: Arc<KillSwitch>,
        blocklist: Arc<BlocklistService>,
        rate_limiter: Arc<RateLimiterService>,
        circuit_breaker: Arc<CircuitBreaker>,
        traffic: Arc<TrafficMonitor>,
        events: Arc<SecurityEventLog>,
    ) -> Self {
        Self {
            kill_switch,
            blocklist,
            rate_limiter,
            circuit_breaker,
            traffic,
            events,
        }
    }

    /// Decide whether `request` may proceed
    pub async fn decide(&self, request: &AdmissionRequest) -> AdmissionDecision {
        self.traffic.record_request().await;

        if self.kill_switch.is_enabled().await {
            debug!(fingerprint = %request.fingerprint, "Denied by kill switch");
            return AdmissionDecision::deny(DenyReason::KillSwitch, None);
        }

        if let Some(ip) = request.ip.as_deref()
            && self.blocklist.is_blocked(ip).await
        {
            self.record(request, SecurityEventKind::Blocked, "ip is blocklisted".to_string())
                .await;
            return AdmissionDecision::deny(DenyReason::Blocked, None);
        }

        if let Some(verdict) = request.bot.as_ref().filter(|v| v.is_bot) {
            let detail = format!("score {}: {}", verdict.score, verdict.reasons.join(", "));
            self.record(request, SecurityEventKind::BotFlagged, detail).await;
        }

        let policy = RateLimitPolicy::from(request.route_class);
        let rate_limit = self
            .rate_limiter
            .check_rate_limit(&request.fingerprint, policy)
            .await;
        if !rate_limit.success {
            let detail = format!("{} policy limit of {} exceeded", policy, rate_limit.limit);
            self.record(request, SecurityEventKind::RateLimited, detail).await;
            return AdmissionDecision::deny(DenyReason::RateLimited, Some(rate_limit));
        }

        if request.is_mutating() && self.circuit_breaker.is_open().await {
            let detail = format!("{} rejected while datastore circuit is open", request.method);
            self.record(request, SecurityEventKind::CircuitOpen, detail).await;
            return AdmissionDecision::deny(DenyReason::CircuitOpen, Some(rate_limit));
        }

        AdmissionDecision::admit(Some(rate_limit))
    }

    pub fn events(&self) -> &Arc<SecurityEventLog> {
        &self.events
    }

    async fn record(&self, request: &AdmissionRequest, kind: SecurityEventKind, detail: String) {
        let event = SecurityEvent::new(kind, detail)
            .with_ip(request.ip.as_deref())
            .with_path(request.path.as_deref());
        self.events.emit(event).await;
    }
}
