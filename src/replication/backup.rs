//! Backup Node Implementation
//!
//! A backup replicates the primary's value passively. It answers READs
//! from its local copy, applies UPDATEs pushed by the primary, and
//! forwards WRITEs it receives to the primary instead of applying them.

use std::net::SocketAddr;

use crate::error::{Error, Result};
use crate::network::{ReplicationClient, RequestHandler};
use crate::replication::{ReplicationConfig, Request, Response};
use crate::state::ReplicaStore;

/// Backup node state
pub struct BackupNode {
    /// Local copy of the replicated value
    store: ReplicaStore,
    /// The primary's address, fixed for this node's lifetime
    primary: String,
    /// Client for the join handshake and write forwarding
    client: ReplicationClient,
}

impl BackupNode {
    /// Perform the join handshake against the primary and return the
    /// ready backup.
    ///
    /// Sends `JOIN:<listen_port>`, blocks for the acknowledgement, then
    /// issues a READ to seed the local store from the primary's *current*
    /// value: a backup joining after earlier writes must not start from
    /// zero. Any failure here is fatal, since a backup cannot exist
    /// without a completed join.
    pub async fn join(
        primary: String,
        listen_port: u16,
        config: ReplicationConfig,
    ) -> Result<Self> {
        let client = ReplicationClient::from_config(&config);

        match client.send(&primary, &Request::Join(listen_port)).await? {
            Response::JoinComplete => {
                tracing::info!("Joined primary {} with port {}", primary, listen_port);
            }
            other => {
                return Err(Error::UnexpectedResponse {
                    request: "JOIN",
                    response: other.to_string(),
                })
            }
        }

        let value = match client.send(&primary, &Request::Read).await? {
            Response::ReadValue(value) => value,
            other => {
                return Err(Error::UnexpectedResponse {
                    request: "READ",
                    response: other.to_string(),
                })
            }
        };
        tracing::info!("Seeded replica from primary, value = {}", value);

        Ok(Self {
            store: ReplicaStore::new(value),
            primary,
            client,
        })
    }

    /// Snapshot the local value. May trail the primary between UPDATEs.
    pub async fn value(&self) -> i64 {
        self.store.get().await
    }

    /// The primary this backup is attached to.
    pub fn primary(&self) -> &str {
        &self.primary
    }
}

#[async_trait::async_trait]
impl RequestHandler for BackupNode {
    async fn handle(&self, peer: SocketAddr, request: Request) -> Result<Response> {
        match request {
            Request::Read => Ok(Response::ReadValue(self.store.get().await)),
            // A client wrote to us instead of the primary: forward, and
            // leave the local store alone. The primary's broadcast comes
            // back to this node on a separate inbound connection and is
            // the only path that moves a backup's value, so a forwarded
            // write is applied exactly once, in primary commit order.
            Request::Write(value) => {
                match self.client.send(&self.primary, &Request::Update(value)).await? {
                    Response::UpdateComplete => Ok(Response::WriteComplete),
                    other => Err(Error::UnexpectedResponse {
                        request: "UPDATE",
                        response: other.to_string(),
                    }),
                }
            }
            Request::Update(value) => {
                self.store.set(value).await;
                tracing::debug!("Applied update {} from {}", value, peer);
                Ok(Response::UpdateComplete)
            }
            // Backups never admit other backups
            Request::Join(_) => {
                tracing::warn!("Rejecting JOIN from {}: not the primary", peer);
                Ok(Response::UnknownCommand)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkServer;
    use crate::replication::PrimaryNode;
    use std::sync::Arc;

    fn quick_config() -> ReplicationConfig {
        ReplicationConfig {
            connect_timeout_ms: 500,
            request_timeout_ms: 2000,
        }
    }

    async fn start_primary() -> (String, Arc<PrimaryNode>) {
        let server = NetworkServer::bind("127.0.0.1:0").await.unwrap();
        let address = server.local_addr().unwrap().to_string();
        let node = Arc::new(PrimaryNode::new(quick_config()));
        let handler = Arc::clone(&node);
        tokio::spawn(async move { server.serve(handler).await });
        (address, node)
    }

    async fn start_backup(primary: &str) -> (String, Arc<BackupNode>) {
        // Bind before joining so broadcasts issued right after the join
        // acknowledgement already land in the socket backlog.
        let server = NetworkServer::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();
        let node = Arc::new(
            BackupNode::join(primary.to_string(), port, quick_config())
                .await
                .unwrap(),
        );
        let handler = Arc::clone(&node);
        tokio::spawn(async move { server.serve(handler).await });
        (format!("127.0.0.1:{}", port), node)
    }

    fn client() -> ReplicationClient {
        ReplicationClient::from_config(&quick_config())
    }

    #[tokio::test]
    async fn test_join_seeds_current_value() {
        let (primary_addr, _primary) = start_primary().await;
        let client = client();

        client
            .send(&primary_addr, &Request::Write(42))
            .await
            .unwrap();

        let (backup_addr, backup) = start_backup(&primary_addr).await;
        assert_eq!(backup.value().await, 42);

        let response = client.send(&backup_addr, &Request::Read).await.unwrap();
        assert_eq!(response, Response::ReadValue(42));
    }

    #[tokio::test]
    async fn test_write_to_primary_reaches_backups() {
        let (primary_addr, primary) = start_primary().await;
        let (b1_addr, _b1) = start_backup(&primary_addr).await;
        let (b2_addr, _b2) = start_backup(&primary_addr).await;

        let client = client();
        let response = client
            .send(&primary_addr, &Request::Write(42))
            .await
            .unwrap();
        assert_eq!(response, Response::WriteComplete);

        // The primary acknowledges only after every backup acknowledged,
        // so the new value is already visible everywhere.
        assert_eq!(primary.value().await, 42);
        for address in [&b1_addr, &b2_addr] {
            let response = client.send(address, &Request::Read).await.unwrap();
            assert_eq!(response, Response::ReadValue(42));
        }
    }

    #[tokio::test]
    async fn test_forwarded_write_converges() {
        let (primary_addr, primary) = start_primary().await;
        let (backup_addr, backup) = start_backup(&primary_addr).await;

        let client = client();
        client
            .send(&primary_addr, &Request::Write(42))
            .await
            .unwrap();

        // Write against the backup: it must route through the primary.
        let response = client.send(&backup_addr, &Request::Write(7)).await.unwrap();
        assert_eq!(response, Response::WriteComplete);

        assert_eq!(primary.value().await, 7);
        assert_eq!(backup.value().await, 7);

        let response = client.send(&primary_addr, &Request::Read).await.unwrap();
        assert_eq!(response, Response::ReadValue(7));
    }

    #[tokio::test]
    async fn test_convergence_over_mixed_writes() {
        let (primary_addr, primary) = start_primary().await;
        let (b1_addr, b1) = start_backup(&primary_addr).await;
        let (b2_addr, b2) = start_backup(&primary_addr).await;

        let client = client();
        for value in [1, 2, 3] {
            client
                .send(&primary_addr, &Request::Write(value))
                .await
                .unwrap();
        }
        client.send(&b1_addr, &Request::Write(4)).await.unwrap();
        client.send(&b2_addr, &Request::Write(5)).await.unwrap();

        assert_eq!(primary.value().await, 5);
        assert_eq!(b1.value().await, 5);
        assert_eq!(b2.value().await, 5);
    }

    #[tokio::test]
    async fn test_membership_ids_follow_join_order() {
        let (primary_addr, primary) = start_primary().await;
        let (b1_addr, _b1) = start_backup(&primary_addr).await;
        let (b2_addr, _b2) = start_backup(&primary_addr).await;
        let (b3_addr, _b3) = start_backup(&primary_addr).await;

        let entries = primary.registry().entries().await;
        assert_eq!(
            entries.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            primary.registry().addresses().await,
            vec![b1_addr, b2_addr, b3_addr]
        );
    }

    #[tokio::test]
    async fn test_backup_rejects_join() {
        let (primary_addr, _primary) = start_primary().await;
        let (_backup_addr, backup) = start_backup(&primary_addr).await;

        let peer = SocketAddr::from(([127, 0, 0, 1], 50000));
        let response = backup.handle(peer, Request::Join(7001)).await.unwrap();
        assert_eq!(response, Response::UnknownCommand);
    }

    #[tokio::test]
    async fn test_join_without_primary_is_fatal() {
        let dead = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };

        let result = BackupNode::join(
            dead,
            7001,
            ReplicationConfig {
                connect_timeout_ms: 200,
                request_timeout_ms: 500,
            },
        )
        .await;
        assert!(result.is_err());
    }
}
