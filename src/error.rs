//! Tandem Error Types

use thiserror::Error;

/// Result type alias for tandem operations
pub type Result<T> = std::result::Result<T, Error>;

/// Tandem error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Protocol errors
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unexpected response to {request}: {response}")]
    UnexpectedResponse {
        request: &'static str,
        response: String,
    },

    // Network errors
    #[error("Bind failed on {address}: {reason}")]
    Bind { address: String, reason: String },

    #[error("Connection failed to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Connection timeout to {0}")]
    ConnectionTimeout(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error means a peer could not be reached or answered
    /// too late. The primary's broadcast treats these as skippable.
    pub fn is_peer_unreachable(&self) -> bool {
        matches!(
            self,
            Error::ConnectionFailed { .. } | Error::ConnectionTimeout(_) | Error::Io(_)
        )
    }
}
