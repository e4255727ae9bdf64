//! INDI error types
//!
//! Provides structured error types for INDI operations.

use std::time::Duration;

/// INDI client errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum IndiError {
    /// Connection to INDI server failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Connection timeout with context
    #[error("Connection timeout: failed to connect to {host}:{port} after {duration:?}")]
    ConnectionTimeout {
        host: String,
        port: u16,
        duration: Duration,
    },
    /// Not connected to server
    #[error("Not connected to INDI server")]
    NotConnected,
    /// Malformed or unexpected protocol message
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// BLOB payload could not be decoded
    #[error("BLOB decode error for {device}.{property}: {message}")]
    BlobDecode {
        device: String,
        property: String,
        message: String,
    },
    /// Socket I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for IndiError {
    fn from(err: std::io::Error) -> Self {
        IndiError::Io(err.to_string())
    }
}

impl From<IndiError> for String {
    fn from(err: IndiError) -> String {
        err.to_string()
    }
}

/// Result type for INDI operations
pub type IndiResult<T> = Result<T, IndiError>;
