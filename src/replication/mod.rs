//! Replication Module
//!
//! The primary/backup roles and the wire protocol between them.

pub mod protocol;

mod backup;
mod primary;

pub use backup::BackupNode;
pub use primary::PrimaryNode;
pub use protocol::{Request, Response};

/// Configuration for replication
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Connection timeout in milliseconds for node-to-node calls
    pub connect_timeout_ms: u64,
    /// Whole-call timeout in milliseconds for node-to-node calls
    pub request_timeout_ms: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 1000,
            request_timeout_ms: 3000,
        }
    }
}
