//! Per-user serialization of updates.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per user id.
///
/// Held for the whole handling of an update so read-decide-write on the
/// user's state never interleaves.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, user_id: i64) -> OwnedMutexGuard<()> {
        // Clone out of the map before awaiting; a DashMap guard must not be
        // held across an await point.
        let mutex = self
            .locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Drop mutexes nobody is holding or waiting on.
    pub fn forget_idle(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.len()
    }
}
