//! Primary Node Implementation
//!
//! The primary is authoritative for the replicated value and for admitting
//! backups. Every mutation in the system funnels through its commit path,
//! which is the serialization point that keeps all replicas converging on
//! the same order of values.

use std::net::SocketAddr;

use crate::error::Result;
use crate::network::{ReplicationClient, RequestHandler};
use crate::replication::{ReplicationConfig, Request, Response};
use crate::state::{BackupRegistry, ReplicaStore};

/// Primary node state
pub struct PrimaryNode {
    /// Authoritative copy of the replicated value
    store: ReplicaStore,
    /// Backups admitted so far, in join order
    registry: BackupRegistry,
    /// Client for the UPDATE fan-out
    client: ReplicationClient,
}

impl PrimaryNode {
    /// Create a new primary. The value starts at 0 with no backups.
    pub fn new(config: ReplicationConfig) -> Self {
        Self {
            store: ReplicaStore::new(0),
            registry: BackupRegistry::new(),
            client: ReplicationClient::from_config(&config),
        }
    }

    /// Snapshot the current value.
    pub async fn value(&self) -> i64 {
        self.store.get().await
    }

    /// The backup registry, for inspection.
    pub fn registry(&self) -> &BackupRegistry {
        &self.registry
    }

    /// Commit a new value: set it locally and propagate it to every
    /// registered backup before returning.
    ///
    /// The store's write guard spans the whole fan-out. READs cannot
    /// observe a value that has not finished propagating, and no two
    /// commits can interleave their broadcasts, so every backup applies
    /// updates in commit order.
    async fn commit(&self, value: i64) {
        let mut current = self.store.begin_write().await;
        *current = value;
        self.broadcast(value).await;
    }

    /// Propagate a value to all registered backups, in join order.
    ///
    /// Delivery is best effort: an unreachable or misbehaving backup is
    /// logged and skipped so that one dead backup cannot stall every
    /// future write. Each call is bounded by the client's timeouts.
    async fn broadcast(&self, value: i64) {
        let addresses = self.registry.addresses().await;
        if addresses.is_empty() {
            return;
        }

        let total = addresses.len();
        let mut acked = 0;
        for address in addresses {
            match self.client.send(&address, &Request::Update(value)).await {
                Ok(Response::UpdateComplete) => {
                    tracing::debug!("Backup {} acknowledged {}", address, value);
                    acked += 1;
                }
                Ok(other) => {
                    tracing::warn!(
                        "Backup {} answered {} to an UPDATE, skipping",
                        address,
                        other.type_name()
                    );
                }
                Err(e) if e.is_peer_unreachable() => {
                    tracing::warn!("Backup {} unreachable, skipping: {}", address, e);
                }
                Err(e) => {
                    tracing::warn!("Propagation to {} failed, skipping: {}", address, e);
                }
            }
        }

        tracing::info!("Propagated {} to {}/{} backups", value, acked, total);
    }
}

#[async_trait::async_trait]
impl RequestHandler for PrimaryNode {
    async fn handle(&self, peer: SocketAddr, request: Request) -> Result<Response> {
        match request {
            Request::Read => Ok(Response::ReadValue(self.store.get().await)),
            Request::Write(value) => {
                self.commit(value).await;
                Ok(Response::WriteComplete)
            }
            // A backup forwarding a write it received. The broadcast goes
            // back out to every backup, the forwarder included: applying
            // the inbound UPDATE is the only way a backup's store moves.
            Request::Update(value) => {
                self.commit(value).await;
                Ok(Response::UpdateComplete)
            }
            Request::Join(port) => {
                let address = format!("{}:{}", peer.ip(), port);
                self.registry.join(address).await;
                Ok(Response::JoinComplete)
            }
        }
    }
}
