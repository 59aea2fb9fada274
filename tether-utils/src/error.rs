//! Error types for tether
//!
//! Provides a unified error type used across all tether crates. Every
//! variant on the connection/request path is recovered inside the
//! integration subsystem; none of them is ever surfaced to the user of
//! the host assistant.

use std::path::PathBuf;

/// Main error type for tether operations
#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Connection Errors ===

    #[error("Connection timed out after {millis}ms")]
    ConnectTimeout { millis: u64 },

    #[error("Connection refused: {0}")]
    ConnectRefused(String),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Not connected to an editor companion")]
    NotConnected,

    // === Protocol Errors ===

    #[error("Protocol version mismatch: client={client}, companion={companion}")]
    ProtocolMismatch { client: u32, companion: u32 },

    #[error("No response within {millis}ms")]
    ResponseTimeout { millis: u64 },

    #[error("Request rejected: {reason}")]
    Rejected { reason: String },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TetherError {
    /// Create a connect-refused error
    pub fn refused(msg: impl Into<String>) -> Self {
        Self::ConnectRefused(msg.into())
    }

    /// Create a rejection error carrying the companion's reason
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Create an invalid-message error
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error is a connection-level failure worth retrying
    /// on a later call
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout { .. } | Self::ConnectRefused(_) | Self::ConnectionClosed
        )
    }
}

/// Result type alias using TetherError
pub type Result<T> = std::result::Result<T, TetherError>;
