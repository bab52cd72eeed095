//! Network Server
//!
//! TCP server accepting connections from clients and peer nodes. Each
//! accepted connection gets its own task running the single
//! request-line/response-line exchange.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

use super::{read_line, write_line};
use crate::error::{Error, Result};
use crate::replication::{Request, Response};

/// Per-role request dispatcher. The primary and backup nodes implement
/// this; the server stays role-agnostic.
#[async_trait::async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle one parsed request from `peer` and produce the response line.
    ///
    /// An `Err` aborts the in-flight operation: it is logged and the
    /// connection is dropped without a completion line.
    async fn handle(&self, peer: SocketAddr, request: Request) -> Result<Response>;
}

/// Network server for one node
pub struct NetworkServer {
    listener: TcpListener,
    /// Shutdown signal
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl NetworkServer {
    /// Bind the listening socket. A bind failure is fatal to node startup.
    pub async fn bind(address: &str) -> Result<Self> {
        let listener = TcpListener::bind(address).await.map_err(|e| Error::Bind {
            address: address.to_string(),
            reason: e.to_string(),
        })?;
        let (shutdown_tx, _) = tokio::sync::watch::channel(false);

        Ok(Self {
            listener,
            shutdown: shutdown_tx,
        })
    }

    /// The actual bound address (resolves port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop, spawning one handler task per connection.
    pub async fn serve(&self, handler: Arc<dyn RequestHandler>) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((socket, peer)) => {
                            let handler = Arc::clone(&handler);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(socket, peer, handler).await {
                                    tracing::warn!("Connection error from {}: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Network server stopped");
        Ok(())
    }

    /// Stop the accept loop.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Handle a single connection: one request line, one response line.
async fn handle_connection(
    socket: TcpStream,
    peer: SocketAddr,
    handler: Arc<dyn RequestHandler>,
) -> Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    let line = match read_line(&mut reader).await? {
        Some(line) => line,
        // Peer connected and went away without a request
        None => return Ok(()),
    };

    let response = match Request::parse(&line) {
        Some(request) => {
            tracing::debug!("Received {} from {}", request.type_name(), peer);
            handler.handle(peer, request).await?
        }
        None => {
            tracing::warn!("Unknown command from {}: {:?}", peer, line);
            Response::UnknownCommand
        }
    };

    write_line(&mut writer, &response.to_string()).await
}
