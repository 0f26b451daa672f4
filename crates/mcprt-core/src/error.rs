//! The error taxonomy from spec §7, as concrete types.
//!
//! One enum per failure kind named in the specification. Handler-runtime and
//! transport-specific variants live in their own crates (`mcprt-client`,
//! `mcprt-transport`) and convert into this core set at the boundary where a
//! caller observes them.

use thiserror::Error;

/// Errors the envelope codec and coordinator surface directly.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum McprtError {
    /// Malformed bytes on the wire. The transport replies with JSON-RPC
    /// `-32700` and does not close.
    #[error("parse error: {0}")]
    Parse(String),

    /// Well-formed JSON that is not a valid envelope. Reply carries
    /// `-32600` when the offending envelope had an `id`.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A server-initiated request named a method with no registered
    /// handler. Reply carries `-32601`.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The negotiated protocol version fell outside the supported set.
    /// Fatal at `start`.
    #[error("unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(String),

    /// Caller attempted to use a capability the session did not negotiate.
    /// Never touches the wire.
    #[error("capability not negotiated: {0}")]
    UnsupportedFeature(String),

    /// A caller's deadline expired waiting on a response, or a handler's
    /// deferred deadline expired.
    #[error("timed out waiting for request {request_id}")]
    Timeout {
        /// The JSON-RPC id of the request that timed out.
        request_id: String,
    },

    /// 401 with no refresh possible and no further retry available.
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    /// An unchecked error inside a handler's `execute`.
    #[error("handler error: {0}")]
    Handler(String),

    /// I/O, TLS, or HTTP failure at the transport layer. Fatal to all
    /// pending requests; the session closes.
    #[error("transport error: {message}")]
    Transport {
        /// Human-readable description.
        message: String,
        /// HTTP status code, when the failure came from an HTTP transport.
        status: Option<u16>,
    },
}

/// Standard JSON-RPC 2.0 error codes (spec §4.1).
pub mod codes {
    /// Invalid JSON was received by the server.
    pub const PARSE_ERROR: i64 = -32700;
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// The requested method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Lower bound (inclusive) of the implementation-defined server error range.
    pub const SERVER_ERROR_MIN: i64 = -32099;
    /// Upper bound (inclusive) of the implementation-defined server error range.
    pub const SERVER_ERROR_MAX: i64 = -32000;
}

/// Result alias used throughout the runtime.
pub type Result<T> = std::result::Result<T, McprtError>;
