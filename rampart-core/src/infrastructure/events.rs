//! Security event log
//!
//! Append-only, capped list in the shared store. Ids come from a persistent
//! store counter so every instance appends to one ordered feed, which the
//! live stream polls for entries newer than the last id it sent.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::errors::StoreError;
use crate::domain::SecurityEvent;
use crate::infrastructure::resilience::StoreGuard;
use crate::infrastructure::store::SharedStore;

const LIST_KEY: &str = "security:events";
const SEQUENCE_KEY: &str = "security:events:seq";

pub struct SecurityEventLog {
    store: Arc<dyn SharedStore>,
    guard: StoreGuard,
    max_entries: usize,
}

impl SecurityEventLog {
    pub fn new(store: Arc<dyn SharedStore>, guard: StoreGuard, max_entries: usize) -> Self {
        Self {
            store,
            guard,
            max_entries,
        }
    }

    /// Assign an id and append the event
    pub async fn record(&self, mut event: SecurityEvent) -> Result<SecurityEvent, StoreError> {
        let id = self.store.incr(SEQUENCE_KEY, None).await?;
        event.id = id.max(0) as u64;

        let payload = serde_json::to_string(&event)
            .map_err(|e| StoreError::corrupt(LIST_KEY, e.to_string()))?;
        self.store
            .push_capped(LIST_KEY, &payload, self.max_entries)
            .await?;

        debug!(
            id = event.id,
            kind = event.kind.as_str(),
            ip = event.ip.as_deref().unwrap_or(""),
            "Security event recorded"
        );
        Ok(event)
    }

    /// Record under the store timeout without surfacing failures to the caller
    pub async fn emit(&self, event: SecurityEvent) {
        let kind = event.kind;
        if let Err(e) = self.guard.run("security_event", self.record(event)).await {
            warn!(kind = kind.as_str(), error = %e, "Failed to record security event");
        }
    }

    /// Newest-first snapshot
    pub async fn recent(&self, limit: usize) -> Result<Vec<SecurityEvent>, StoreError> {
        let limit = limit.min(self.max_entries);
        let raw = self.store.list_range(LIST_KEY, limit).await?;
        Ok(raw
            .iter()
            .filter_map(|line| match serde_json::from_str::<SecurityEvent>(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed security event");
                    None
                }
            })
            .collect())
    }

    /// Events with an id greater than `last_id`, oldest first
    pub async fn since(&self, last_id: u64) -> Result<Vec<SecurityEvent>, StoreError> {
        let mut events: Vec<SecurityEvent> = self
            .recent(self.max_entries)
            .await?
            .into_iter()
            .filter(|e| e.id > last_id)
            .collect();
        events.sort_by_key(|e| e.id);
        Ok(events)
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}
