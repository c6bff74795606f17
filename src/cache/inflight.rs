use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard proving the holder is the only fetcher for its key
pub type KeyGuard = OwnedMutexGuard<()>;

/// Table of per-key async locks
///
/// A caller holding the guard for a key is the only one allowed to fetch and
/// write that key. Callers arriving while it is held wait, then re-read the
/// cache instead of fetching again.
#[derive(Debug, Default)]
pub struct InFlight {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds `key`, then takes it
    pub async fn acquire(&self, key: &str) -> KeyGuard {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            // Entries only referenced by the table are idle
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);

            let lock = locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone();
            lock
        };

        lock.lock_owned().await
    }
}
