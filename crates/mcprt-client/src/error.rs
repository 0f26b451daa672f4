//! Handler-runtime error taxonomy.
//!
//! Grounded on the teacher's `handlers.rs::HandlerError`, narrowed to the
//! outcomes a guard, hook, or `execute` body can produce once control has
//! already been routed to a registered handler. Wire-level failures
//! (unknown method, malformed params) are `mcprt_core::McprtError` and never
//! reach a handler at all.

use thiserror::Error;

/// What went wrong while running a registered handler.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum HandlerError {
    /// A guard rejected the request before `execute` ran.
    #[error("rejected by guard: {0}")]
    GuardRejected(String),

    /// A required `Options` field was missing at handler construction time.
    #[error("missing required option: {0}")]
    MissingOption(String),

    /// The human declined, or the handler otherwise chose not to proceed.
    #[error("declined: {0}")]
    Declined(String),

    /// The human (or the server) cancelled the request mid-flight.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// A deferred handler's deadline elapsed before it settled.
    #[error("timed out after {timeout_secs}s")]
    TimedOut {
        /// The deadline that elapsed, in seconds.
        timeout_secs: u64,
    },

    /// The server-supplied input failed handler-side validation (e.g. an
    /// elicitation response against the server's schema).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An uncaught error surfaced from inside `execute`.
    #[error("handler error: {0}")]
    Execution(String),
}

impl HandlerError {
    /// The JSON-RPC `(code, message)` pair this error becomes when it must
    /// travel back over the wire as an `Envelope::Error` reply.
    ///
    /// `GuardRejected`/`Declined`/`Cancelled` use `-1`, the code the MCP
    /// 2025-06-18 spec reserves for a user declining a sampling request;
    /// this runtime reuses it for the same "the human said no" shape across
    /// every handler kind rather than inventing a second code for it.
    #[must_use]
    pub fn as_jsonrpc(&self) -> (i64, String) {
        match self {
            HandlerError::GuardRejected(reason) | HandlerError::Declined(reason) | HandlerError::Cancelled(reason) => {
                (-1, reason.clone())
            }
            HandlerError::TimedOut { .. } => (-32801, self.to_string()),
            HandlerError::InvalidInput(_) => (mcprt_core::error::codes::INVALID_PARAMS, self.to_string()),
            HandlerError::MissingOption(_) => (mcprt_core::error::codes::INVALID_REQUEST, self.to_string()),
            HandlerError::Execution(_) => (mcprt_core::error::codes::INTERNAL_ERROR, self.to_string()),
        }
    }
}

impl From<HandlerError> for mcprt_core::McprtError {
    fn from(err: HandlerError) -> Self {
        mcprt_core::McprtError::Handler(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_rejection_maps_to_the_reserved_decline_code() {
        let (code, _) = HandlerError::GuardRejected("no".into()).as_jsonrpc();
        assert_eq!(code, -1);
    }

    #[test]
    fn timeout_maps_to_dash_32801() {
        let (code, _) = HandlerError::TimedOut { timeout_secs: 30 }.as_jsonrpc();
        assert_eq!(code, -32801);
    }
}
