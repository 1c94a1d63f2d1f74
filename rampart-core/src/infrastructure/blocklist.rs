//! IP blocklist backed by the shared store
//!
//! Entries survive restarts because they live in the shared store. A TTL
//! makes the block lift itself; without one it stays until `unblock`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::application::errors::{ApplicationError, StoreError};
use crate::infrastructure::resilience::StoreGuard;
use crate::infrastructure::store::SharedStore;

const KEY_PREFIX: &str = "blocklist:ip:";

/// Stored blocklist record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlocklistEntry {
    #[serde(default)]
    pub reason: Option<String>,
    pub blocked_at: DateTime<Utc>,
    /// `None` for permanent blocks
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Parse and canonicalise an IP address
pub fn normalize_ip(raw: &str) -> Result<IpAddr, ApplicationError> {
    raw.trim()
        .parse::<IpAddr>()
        .map_err(|_| ApplicationError::invalid_input("ip", format!("'{}' is not an IP address", raw)))
}

fn key(ip: &IpAddr) -> String {
    format!("{}{}", KEY_PREFIX, ip)
}

pub struct BlocklistService {
    store: Arc<dyn SharedStore>,
    guard: StoreGuard,
    default_ttl_seconds: Option<u64>,
}

impl BlocklistService {
    pub fn new(
        store: Arc<dyn SharedStore>,
        guard: StoreGuard,
        default_ttl_seconds: Option<u64>,
    ) -> Self {
        Self {
            store,
            guard,
            default_ttl_seconds,
        }
    }

    /// Whether `ip` is currently blocked
    ///
    /// Unparseable addresses are never blocked. Store failures resolve
    /// through the failure policy (not blocked when failing open).
    pub async fn is_blocked(&self, ip: &str) -> bool {
        let Ok(ip) = normalize_ip(ip) else {
            return false;
        };
        let key = key(&ip);
        self.guard
            .run_or(
                "blocklist_check",
                async { Ok::<_, StoreError>(self.store.get(&key).await?.is_some()) },
                false,
                true,
            )
            .await
    }

    /// Block `ip`; `ttl_seconds` of `None` uses the configured default and `0` is permanent
    pub async fn block(
        &self,
        ip: &str,
        ttl_seconds: Option<u64>,
        reason: Option<String>,
    ) -> Result<BlocklistEntry, ApplicationError> {
        let ip = normalize_ip(ip)?;
        let ttl = ttl_seconds
            .or(self.default_ttl_seconds)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let now = Utc::now();
        let entry = BlocklistEntry {
            reason,
            blocked_at: now,
            expires_at: ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok().map(|d| now + d)),
        };

        let value = serde_json::to_string(&entry)?;
        self.store.set(&key(&ip), &value, ttl).await?;

        info!(
            ip = %ip,
            ttl_seconds = ttl.map(|t| t.as_secs()),
            reason = entry.reason.as_deref().unwrap_or(""),
            "IP blocked"
        );
        Ok(entry)
    }

    /// Remove a block, returning whether one existed
    pub async fn unblock(&self, ip: &str) -> Result<bool, ApplicationError> {
        let ip = normalize_ip(ip)?;
        let removed = self.store.delete(&key(&ip)).await?;
        info!(ip = %ip, removed = removed, "IP unblocked");
        Ok(removed)
    }

    /// Current block record for `ip`
    pub async fn entry(&self, ip: &str) -> Result<Option<BlocklistEntry>, ApplicationError> {
        let ip = normalize_ip(ip)?;
        let Some(raw) = self.store.get(&key(&ip)).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                // Entries written by other tools may be a bare flag
                debug!(ip = %ip, error = %e, "Blocklist entry is not JSON");
                Ok(Some(BlocklistEntry {
                    reason: None,
                    blocked_at: Utc::now(),
                    expires_at: None,
                }))
            }
        }
    }
}
