//! Correlation table matching outbound requests to their inbound responses.
//!
//! Grounded on the correlation map in the teacher's bidirectional transport
//! wrapper (a concurrent map of id to a single-shot response channel), but
//! simplified: deadlines are the caller's responsibility (wrap the returned
//! receiver in `tokio::time::timeout` and call [`PendingRequestTable::cancel`]
//! on expiry) rather than tracked internally, since every caller already
//! owns a `Duration` from its own request options.

use dashmap::DashMap;
use tokio::sync::oneshot;

use mcprt_core::jsonrpc::{Envelope, RequestId};

use crate::error::TransportError;

/// What a pending request's mailbox ultimately resolves to.
pub type PendingOutcome = Result<Envelope, TransportError>;

/// A concurrent, single-shot mailbox per in-flight request id.
///
/// `register` and `deliver`/`cancel` are O(1) `DashMap` operations. Each id
/// may be registered once at a time; registering an id a second time before
/// its first registration resolves replaces the earlier mailbox (the old
/// receiver is simply dropped, which is the correct behavior for the one
/// call site, `Coordinator::request`, that allocates fresh ids per call).
#[derive(Debug, Default)]
pub struct PendingRequestTable {
    inflight: DashMap<RequestId, oneshot::Sender<PendingOutcome>>,
}

impl PendingRequestTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self { inflight: DashMap::new() }
    }

    /// Reserve a mailbox for `id`, returning the receiver half. The caller
    /// is expected to have already sent the matching request over the wire
    /// (or be about to) before awaiting the receiver.
    pub fn register(&self, id: RequestId) -> oneshot::Receiver<PendingOutcome> {
        let (tx, rx) = oneshot::channel();
        self.inflight.insert(id, tx);
        rx
    }

    /// Deliver a response envelope to the matching mailbox.
    ///
    /// Returns `true` if a mailbox was waiting for this id, `false` if the
    /// id is unknown (already delivered, cancelled, or never registered —
    /// the caller should log and drop the envelope, not treat it as fatal).
    pub fn deliver(&self, id: &RequestId, envelope: Envelope) -> bool {
        match self.inflight.remove(id) {
            Some((_, tx)) => {
                let _ = tx.send(Ok(envelope));
                true
            }
            None => false,
        }
    }

    /// Cancel a single pending request, e.g. because its deadline elapsed
    /// or the caller's future was dropped. Resolves the mailbox with
    /// [`TransportError::Timeout`] when `timed_out` is set, otherwise
    /// [`TransportError::Cancelled`].
    pub fn cancel(&self, id: &RequestId, timed_out: bool) -> bool {
        match self.inflight.remove(id) {
            Some((_, tx)) => {
                let err = if timed_out { TransportError::Timeout } else { TransportError::Cancelled };
                let _ = tx.send(Err(err));
                true
            }
            None => false,
        }
    }

    /// Resolve every outstanding mailbox with the same failure. Called once
    /// when the underlying transport dies: every in-flight request becomes
    /// `TransportError::ConnectionLost` rather than hanging forever.
    pub fn fail_all(&self, reason: TransportError) {
        let ids: Vec<RequestId> = self.inflight.iter().map(|entry| entry.key().clone()).collect();
        for id in ids {
            if let Some((_, tx)) = self.inflight.remove(&id) {
                let _ = tx.send(Err(reason.clone()));
            }
        }
    }

    /// Number of requests currently awaiting a response.
    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    /// `true` when no requests are in flight.
    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcprt_core::jsonrpc::RequestId;
    use serde_json::json;

    fn success(id: RequestId) -> Envelope {
        Envelope::success(id, json!({"ok": true}))
    }

    #[tokio::test]
    async fn deliver_resolves_the_matching_receiver() {
        let table = PendingRequestTable::new();
        let id = RequestId::Number(1);
        let rx = table.register(id.clone());
        assert!(table.deliver(&id, success(id.clone())));
        let outcome = rx.await.unwrap();
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn deliver_to_unknown_id_is_a_harmless_no_op() {
        let table = PendingRequestTable::new();
        assert!(!table.deliver(&RequestId::Number(99), success(RequestId::Number(99))));
    }

    #[tokio::test]
    async fn cancel_resolves_with_timeout_when_requested() {
        let table = PendingRequestTable::new();
        let id = RequestId::Number(2);
        let rx = table.register(id.clone());
        assert!(table.cancel(&id, true));
        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Err(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn fail_all_drains_every_mailbox() {
        let table = PendingRequestTable::new();
        let rx1 = table.register(RequestId::Number(1));
        let rx2 = table.register(RequestId::Number(2));
        table.fail_all(TransportError::ConnectionLost("eof".into()));
        assert!(table.is_empty());
        assert!(matches!(rx1.await.unwrap(), Err(TransportError::ConnectionLost(_))));
        assert!(matches!(rx2.await.unwrap(), Err(TransportError::ConnectionLost(_))));
    }
}
