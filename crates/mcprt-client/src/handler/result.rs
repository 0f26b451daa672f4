//! Discriminated results a server-initiated request handler can produce
//! (spec §3).

use std::time::Duration;

/// What a sampling or elicitation handler decided.
///
/// `T` is the accepted payload type (`CreateMessageResult` for sampling, a
/// validated `serde_json::Value` for elicitation). `D` is the deferred
/// completion object the coordinator should park under the request id and
/// resolve later — an [`crate::async_response::AsyncResponse`].
#[derive(Debug, Clone)]
pub enum HandlerResult<T, D> {
    /// Answer now with `T`.
    Accept(T),
    /// Answer now with a rejection. Sampling handlers use this for "I won't
    /// generate a completion"; elicitation handlers use it for a schema or
    /// input problem distinct from the user declining.
    Reject(String),
    /// The user explicitly declined or dismissed the prompt (elicitation
    /// only; a sampling handler that never shows the user anything has no
    /// use for this variant and should use `Reject` instead).
    Cancel(String),
    /// Defer the answer. `D` is handed back to the caller so the
    /// coordinator can register it under the request id and reply once it
    /// settles.
    Defer(D),
}

/// What a human-in-the-loop confirmation gate decided.
#[derive(Debug, Clone)]
pub enum HumanInTheLoopResult {
    /// The action is approved, proceed.
    Approve,
    /// The action is denied, with a reason surfaced to the caller.
    Deny(String),
    /// Defer the decision; time out after `Duration` if nobody answers.
    Defer(Duration),
}
