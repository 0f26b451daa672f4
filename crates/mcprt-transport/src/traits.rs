//! The [`Transport`] trait every carrier (stdio, SSE, streamable HTTP, or a
//! caller's own custom implementation) must satisfy.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::error::TransportResult;

/// Which carrier a [`Transport`] implementation speaks. Informational only —
/// the coordinator does not branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// A spawned child process communicating over stdin/stdout.
    Stdio,
    /// Server-Sent Events plus a companion POST endpoint (the legacy HTTP
    /// transport, MCP protocol versions up to 2025-03-26).
    Sse,
    /// A single streamable HTTP endpoint (MCP protocol version 2025-06-18).
    StreamableHttp,
    /// A caller-supplied transport registered under a name.
    Custom,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Sse => "sse",
            TransportKind::StreamableHttp => "streamable-http",
            TransportKind::Custom => "custom",
        };
        f.write_str(s)
    }
}

/// A bidirectional, message-oriented channel to an MCP server.
///
/// Implementations own their own interior mutability: every method takes
/// `&self` so a transport can be held behind a plain `Arc` and driven
/// concurrently by a writer (sessions calling `send`) and a reader task
/// (repeatedly calling `recv`). State that never crosses an `.await` point
/// should use `std::sync::Mutex`; state that does (the child process handle,
/// the HTTP connection) should use `tokio::sync::Mutex`, matching the hybrid
/// pattern used throughout this runtime.
///
/// Messages cross this boundary as already-classified JSON values — a
/// single JSON-RPC envelope per call — not raw bytes. Framing (newline
/// delimiting for stdio, SSE `data:` fields, HTTP body parsing) is each
/// implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Which carrier this is.
    fn kind(&self) -> TransportKind;

    /// Establish the connection. Calling `connect` twice on an already
    /// connected transport is a no-op.
    async fn connect(&self) -> TransportResult<()>;

    /// Write one JSON-RPC envelope. Implementations do not buffer past
    /// their underlying OS/HTTP send call — a caller awaiting `send` knows
    /// the bytes left the process once it returns `Ok`.
    async fn send(&self, message: Value) -> TransportResult<()>;

    /// Read the next inbound envelope, or `Ok(None)` once the peer closed
    /// its end cleanly (EOF). Never auto-reconnects; a closed transport
    /// stays closed.
    async fn recv(&self) -> TransportResult<Option<Value>>;

    /// Tear the connection down. Idempotent: closing twice is a no-op, not
    /// an error.
    async fn close(&self) -> TransportResult<()>;

    /// Best-effort liveness check that does not require an `.await`.
    fn is_alive(&self) -> bool;
}
