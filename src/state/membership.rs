//! Backup Membership
//!
//! Tracks the backups admitted by the primary.

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// A registered backup.
#[derive(Debug, Clone)]
pub struct BackupEntry {
    /// Sequential identifier, assigned in join order starting at 1
    pub id: u64,
    /// The backup's listening address (host:port)
    pub address: String,
    /// When the backup joined
    pub joined_at: DateTime<Utc>,
}

/// Registry of backups, owned exclusively by the primary.
///
/// The registry only grows. There is no failure detection and no removal:
/// a crashed backup stays registered and every future broadcast keeps
/// attempting it. Ids are unique and strictly increasing, and the fan-out
/// list preserves join order.
pub struct BackupRegistry {
    backups: RwLock<Vec<BackupEntry>>,
}

impl BackupRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            backups: RwLock::new(Vec::new()),
        }
    }

    /// Register a backup address and return its id.
    ///
    /// Joining an already registered address is idempotent: the original
    /// entry keeps its id and no duplicate is appended, so a restarted
    /// backup can redo its handshake without wedging itself.
    pub async fn join(&self, address: String) -> u64 {
        let mut backups = self.backups.write().await;
        if let Some(existing) = backups.iter().find(|b| b.address == address) {
            tracing::debug!("Backup {} re-joined as id {}", address, existing.id);
            return existing.id;
        }

        let entry = BackupEntry {
            id: backups.len() as u64 + 1,
            address,
            joined_at: Utc::now(),
        };
        tracing::info!(
            "Registered backup {} as id {} at {}",
            entry.address,
            entry.id,
            entry.joined_at.to_rfc3339()
        );
        let id = entry.id;
        backups.push(entry);
        id
    }

    /// All backup addresses in join order. This is the broadcast fan-out list.
    pub async fn addresses(&self) -> Vec<String> {
        self.backups.read().await.iter().map(|b| b.address.clone()).collect()
    }

    /// Snapshot of all entries in join order.
    pub async fn entries(&self) -> Vec<BackupEntry> {
        self.backups.read().await.clone()
    }

    /// Number of registered backups.
    pub async fn len(&self) -> usize {
        self.backups.read().await.len()
    }

    /// Whether any backup has joined yet.
    pub async fn is_empty(&self) -> bool {
        self.backups.read().await.is_empty()
    }
}

impl Default for BackupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequential_ids_in_join_order() {
        let registry = BackupRegistry::new();

        assert_eq!(registry.join("127.0.0.1:7001".into()).await, 1);
        assert_eq!(registry.join("127.0.0.1:7002".into()).await, 2);
        assert_eq!(registry.join("127.0.0.1:7003".into()).await, 3);

        assert_eq!(
            registry.addresses().await,
            vec!["127.0.0.1:7001", "127.0.0.1:7002", "127.0.0.1:7003"]
        );
        assert_eq!(registry.len().await, 3);
    }

    #[tokio::test]
    async fn test_rejoin_is_idempotent() {
        let registry = BackupRegistry::new();

        assert_eq!(registry.join("127.0.0.1:7001".into()).await, 1);
        assert_eq!(registry.join("127.0.0.1:7002".into()).await, 2);
        // Restarted backup redoes its handshake
        assert_eq!(registry.join("127.0.0.1:7001".into()).await, 1);

        assert_eq!(registry.len().await, 2);
        let entries = registry.entries().await;
        assert_eq!(entries[0].id, 1);
        assert_eq!(entries[1].id, 2);
    }

    #[tokio::test]
    async fn test_empty() {
        let registry = BackupRegistry::new();
        assert!(registry.is_empty().await);
        assert!(registry.addresses().await.is_empty());
    }
}
