//! Network Client
//!
//! Outbound request/response helper. Every call opens a fresh connection,
//! writes one request line, reads one response line and closes. There is
//! no retry: each call either returns the peer's response or fails.

use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{read_line, write_line};
use crate::error::{Error, Result};
use crate::replication::{ReplicationConfig, Request, Response};

/// Client used for all node-to-node calls: the primary's UPDATE fan-out
/// and a backup's JOIN/READ handshake and write forwarding.
pub struct ReplicationClient {
    /// Connection timeout
    connect_timeout: Duration,
    /// Whole-call timeout
    request_timeout: Duration,
}

impl ReplicationClient {
    /// Create a new client with explicit timeouts.
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            request_timeout,
        }
    }

    /// Create a client from replication settings.
    pub fn from_config(config: &ReplicationConfig) -> Self {
        Self::new(
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    /// Send one request to a peer and wait for its response.
    pub async fn send(&self, address: &str, request: &Request) -> Result<Response> {
        let result = timeout(self.request_timeout, self.send_inner(address, request)).await;

        match result {
            Ok(inner_result) => inner_result,
            Err(_) => Err(Error::ConnectionTimeout(address.to_string())),
        }
    }

    /// Send without the whole-call timeout wrapper
    async fn send_inner(&self, address: &str, request: &Request) -> Result<Response> {
        let stream = self.connect(address).await?;
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        write_line(&mut writer, &request.to_string()).await?;

        match read_line(&mut reader).await? {
            Some(line) => Response::parse(&line),
            None => Err(Error::ConnectionFailed {
                address: address.to_string(),
                reason: "peer closed the connection before responding".to_string(),
            }),
        }
    }

    /// Connect to an address
    async fn connect(&self, address: &str) -> Result<TcpStream> {
        let result = timeout(self.connect_timeout, TcpStream::connect(address)).await;

        match result {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true)?;
                Ok(stream)
            }
            Ok(Err(e)) => Err(Error::ConnectionFailed {
                address: address.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(Error::ConnectionTimeout(address.to_string())),
        }
    }
}
