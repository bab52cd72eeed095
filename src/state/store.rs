//! Replica Store
//!
//! Holds a node's copy of the replicated value.

use tokio::sync::{RwLock, RwLockWriteGuard};

/// A node's copy of the replicated integer.
///
/// Reads take the read lock, so a snapshot is never observed mid-commit.
/// The primary holds the write guard from [`ReplicaStore::begin_write`]
/// across the whole mutate-then-broadcast sequence, which totally orders
/// WRITE/UPDATE commits and keeps READs from seeing a value that has not
/// reached the backups yet.
pub struct ReplicaStore {
    value: RwLock<i64>,
}

impl ReplicaStore {
    /// Create a store holding the given initial value.
    pub fn new(initial: i64) -> Self {
        Self {
            value: RwLock::new(initial),
        }
    }

    /// Snapshot the current value.
    pub async fn get(&self) -> i64 {
        *self.value.read().await
    }

    /// Set the value. Used on backups, where applying an inbound UPDATE
    /// is the entire critical section.
    pub async fn set(&self, value: i64) {
        *self.value.write().await = value;
    }

    /// Acquire the write guard for a commit. The caller keeps the guard
    /// alive until propagation finished.
    pub async fn begin_write(&self) -> RwLockWriteGuard<'_, i64> {
        self.value.write().await
    }
}

impl Default for ReplicaStore {
    fn default() -> Self {
        Self::new(0)
    }
}
