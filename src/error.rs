//! Error types for orderer-broadcast

use thiserror::Error;

/// Errors that terminate a broadcast session or reject configuration
///
/// Per-message conditions (queue full, rejected by filters) are never
/// errors; they are reported to the sender as a response status.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// I/O failure on the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The inbound side of the stream ended
    #[error("Stream closed by peer")]
    StreamClosed,

    /// Transport-specific failure that is not an `io::Error`
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BroadcastError {
    /// Whether this error is a normal end of stream rather than a failure
    pub fn is_closed(&self) -> bool {
        matches!(self, BroadcastError::StreamClosed)
    }
}

/// Result type alias for broadcast operations
pub type Result<T> = std::result::Result<T, BroadcastError>;
