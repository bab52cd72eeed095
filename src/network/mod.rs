//! Network Module
//!
//! Handles TCP communication between nodes. The wire format is one UTF-8
//! command line per connection, answered by one response line.

mod client;
mod server;

pub use client::ReplicationClient;
pub use server::{NetworkServer, RequestHandler};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Result;

/// Read one line from a reader. Returns `None` when the peer closed the
/// connection before sending anything; trailing `\r\n` is stripped.
pub async fn read_line<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

/// Write one `\n`-terminated line to a writer and flush it.
pub async fn write_line<W>(writer: &mut W, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
