//! Transport-layer error taxonomy.

use thiserror::Error;

/// A specialized `Result` for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors a [`crate::Transport`] implementation may surface.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum TransportError {
    /// Failed to establish the underlying connection (spawn, dial, handshake).
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A previously established connection dropped unexpectedly.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The outbound half of the transport rejected a write.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The inbound half of the transport failed while reading.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// A message failed to serialize or deserialize.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// The peer violated the wire protocol (bad framing, unexpected content type).
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A request or connect attempt exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// The request was cancelled before a response arrived.
    #[error("request cancelled")]
    Cancelled,

    /// A message exceeded the transport's configured size limit.
    #[error("message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge {
        /// Size of the offending message, in bytes.
        size: usize,
        /// Configured limit, in bytes.
        max: usize,
    },

    /// The transport was asked to do something before it was connected, or
    /// after it closed.
    #[error("transport not connected")]
    NotConnected,

    /// An HTTP transport received a 401 it could not clear by refreshing
    /// credentials once, or had no credentials to offer at all.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The transport rejected its own configuration.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationFailed(err.to_string())
    }
}
