//! Global kill switch
//!
//! When on, every request going through admission is rejected. The flag is
//! persistent so it survives restarts and applies to every instance.

use std::sync::Arc;
use tracing::warn;

use crate::application::errors::StoreError;
use crate::infrastructure::resilience::StoreGuard;
use crate::infrastructure::store::SharedStore;

const KEY: &str = "killswitch:enabled";

pub struct KillSwitch {
    store: Arc<dyn SharedStore>,
    guard: StoreGuard,
}

impl KillSwitch {
    pub fn new(store: Arc<dyn SharedStore>, guard: StoreGuard) -> Self {
        Self { store, guard }
    }

    /// Admission-path read; store failures resolve through the failure policy
    pub async fn is_enabled(&self) -> bool {
        self.guard
            .run_or("kill_switch_check", self.read(), false, true)
            .await
    }

    /// Raw read of the flag
    pub async fn read(&self) -> Result<bool, StoreError> {
        Ok(self
            .store
            .get(KEY)
            .await?
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")))
    }

    pub async fn set(&self, enabled: bool) -> Result<(), StoreError> {
        if enabled {
            self.store.set(KEY, "1", None).await?;
        } else {
            self.store.delete(KEY).await?;
        }
        warn!(enabled = enabled, "Kill switch updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::InMemoryStore;

    #[tokio::test]
    async fn test_toggle() {
        let switch = KillSwitch::new(Arc::new(InMemoryStore::new()), StoreGuard::default());
        assert!(!switch.is_enabled().await);
        switch.set(true).await.unwrap();
        assert!(switch.is_enabled().await);
        assert!(switch.read().await.unwrap());
        switch.set(false).await.unwrap();
        assert!(!switch.is_enabled().await);
    }

    #[tokio::test]
    async fn test_flag_is_persistent() {
        let store = Arc::new(InMemoryStore::new());
        let switch = KillSwitch::new(store.clone(), StoreGuard::default());
        switch.set(true).await.unwrap();
        assert_eq!(store.ttl(KEY).await.unwrap(), None);
        // A second handle over the same store sees the flag
        let other = KillSwitch::new(store, StoreGuard::default());
        assert!(other.is_enabled().await);
    }
}
