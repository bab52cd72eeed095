//! Replication Protocol
//!
//! Defines the line-based wire protocol spoken between clients, the primary
//! and the backups. Every exchange is a single UTF-8 request line answered
//! by a single response line.

use std::fmt;

use crate::error::{Error, Result};

/// Protocol requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Read the replicated value
    Read,
    /// Set the replicated value
    Write(i64),
    /// Propagate a value (primary to backup, or backup forwarding to primary)
    Update(i64),
    /// Register a backup listening on the given port
    Join(u16),
}

/// Protocol responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Value snapshot answering a READ
    ReadValue(i64),
    /// WRITE applied and propagated
    WriteComplete,
    /// UPDATE applied
    UpdateComplete,
    /// JOIN accepted
    JoinComplete,
    /// Request line was not recognized
    UnknownCommand,
}

impl Request {
    /// Parse a request line. Returns `None` for anything that is not a
    /// well-formed command, including numeric payloads that do not parse;
    /// the server answers those with [`Response::UnknownCommand`].
    pub fn parse(line: &str) -> Option<Request> {
        let line = line.trim();
        if line == "READ" {
            return Some(Request::Read);
        }
        if let Some(raw) = line.strip_prefix("WRITE:") {
            return raw.trim().parse().ok().map(Request::Write);
        }
        if let Some(raw) = line.strip_prefix("UPDATE:") {
            return raw.trim().parse().ok().map(Request::Update);
        }
        if let Some(raw) = line.strip_prefix("JOIN:") {
            return raw.trim().parse().ok().map(Request::Join);
        }
        None
    }

    /// Get the request type name (for logging)
    pub fn type_name(&self) -> &'static str {
        match self {
            Request::Read => "READ",
            Request::Write(_) => "WRITE",
            Request::Update(_) => "UPDATE",
            Request::Join(_) => "JOIN",
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Read => write!(f, "READ"),
            Request::Write(value) => write!(f, "WRITE:{}", value),
            Request::Update(value) => write!(f, "UPDATE:{}", value),
            Request::Join(port) => write!(f, "JOIN:{}", port),
        }
    }
}

impl Response {
    /// Parse a response line received from a peer.
    pub fn parse(line: &str) -> Result<Response> {
        let line = line.trim();
        if let Some(raw) = line.strip_prefix("COMPLETE_READ:") {
            let value = raw
                .trim()
                .parse()
                .map_err(|_| Error::Protocol(format!("bad READ payload: {:?}", line)))?;
            return Ok(Response::ReadValue(value));
        }
        match line {
            "COMPLETE_WRITE" => Ok(Response::WriteComplete),
            "COMPLETE_UPDATE" => Ok(Response::UpdateComplete),
            "COMPLETE_JOIN" => Ok(Response::JoinComplete),
            "ERROR: Unknown command" => Ok(Response::UnknownCommand),
            other => Err(Error::Protocol(format!("unrecognized response: {:?}", other))),
        }
    }

    /// Get the response type name (for logging)
    pub fn type_name(&self) -> &'static str {
        match self {
            Response::ReadValue(_) => "COMPLETE_READ",
            Response::WriteComplete => "COMPLETE_WRITE",
            Response::UpdateComplete => "COMPLETE_UPDATE",
            Response::JoinComplete => "COMPLETE_JOIN",
            Response::UnknownCommand => "ERROR",
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::ReadValue(value) => write!(f, "COMPLETE_READ: {}", value),
            Response::WriteComplete => write!(f, "COMPLETE_WRITE"),
            Response::UpdateComplete => write!(f, "COMPLETE_UPDATE"),
            Response::JoinComplete => write!(f, "COMPLETE_JOIN"),
            Response::UnknownCommand => write!(f, "ERROR: Unknown command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trip() {
        for request in [
            Request::Read,
            Request::Write(42),
            Request::Write(-7),
            Request::Update(0),
            Request::Join(7654),
        ] {
            let line = request.to_string();
            assert_eq!(Request::parse(&line), Some(request));
        }
    }

    #[test]
    fn test_request_rejects_garbage() {
        assert_eq!(Request::parse("DELETE:1"), None);
        assert_eq!(Request::parse("WRITE:abc"), None);
        assert_eq!(Request::parse("JOIN:-1"), None);
        assert_eq!(Request::parse(""), None);
        assert_eq!(Request::parse("write:1"), None);
    }

    #[test]
    fn test_request_tolerates_line_endings() {
        assert_eq!(Request::parse("READ\r\n"), Some(Request::Read));
        assert_eq!(Request::parse("WRITE:5\n"), Some(Request::Write(5)));
    }

    #[test]
    fn test_response_round_trip() {
        for response in [
            Response::ReadValue(42),
            Response::ReadValue(-1),
            Response::WriteComplete,
            Response::UpdateComplete,
            Response::JoinComplete,
            Response::UnknownCommand,
        ] {
            let line = response.to_string();
            assert_eq!(Response::parse(&line).unwrap(), response);
        }
    }

    #[test]
    fn test_read_response_format() {
        // The space after the colon is part of the wire format.
        assert_eq!(Response::ReadValue(42).to_string(), "COMPLETE_READ: 42");
        assert_eq!(
            Response::UnknownCommand.to_string(),
            "ERROR: Unknown command"
        );
    }

    #[test]
    fn test_response_rejects_garbage() {
        assert!(Response::parse("COMPLETE_NOPE").is_err());
        assert!(Response::parse("COMPLETE_READ: x").is_err());
    }
}
