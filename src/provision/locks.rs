//! Per-site mutual exclusion for mutating workflows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::provision::naming::SiteName;

/// Hands out one async mutex per subdomain. Entries are dropped again once
/// nobody holds or waits on them.
#[derive(Debug, Default, Clone)]
pub struct SiteLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

/// Held for the duration of one create / add-domain / delete.
pub struct SiteGuard {
    _guard: OwnedMutexGuard<()>,
    key: String,
    locks: SiteLocks,
}

impl SiteLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, site: &SiteName) -> SiteGuard {
        let key = site.as_str().to_string();
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = lock.lock_owned().await;
        SiteGuard {
            _guard: guard,
            key,
            locks: self.clone(),
        }
    }

    /// Number of subdomains with a live lock entry.
    pub fn active(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for SiteGuard {
    fn drop(&mut self) {
        let mut map = self.locks.inner.lock().unwrap_or_else(|e| e.into_inner());
        // Two references remain when nobody else is waiting: the map's and
        // the one inside our own guard.
        if let Some(lock) = map.get(&self.key)
            && Arc::strong_count(lock) <= 2
        {
            map.remove(&self.key);
        }
    }
}
