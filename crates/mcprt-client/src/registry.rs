//! Owner-scoped, request-id-keyed registries for deferred handler replies
//! (spec §3, §4.8).
//!
//! Unlike [`crate::handler::HandlerSlots`] (one slot per handler kind, set
//! once), these are process-wide maps: every `Defer`red elicitation or
//! human-in-the-loop request gets an entry here, keyed by the JSON-RPC
//! request id it must eventually answer. `owner` namespaces entries by
//! whichever session or subsystem created them, so `release(owner)` can
//! sweep every outstanding deferral that session owned without disturbing
//! another session's in-flight entries in the same process.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use mcprt_core::jsonrpc::RequestId;
use serde_json::Value;
use tracing::warn;

use crate::async_response::AsyncResponse;

type Entry<T> = (String, AsyncResponse<T>);

/// A request-id-keyed map of in-flight [`AsyncResponse`]s, scoped by owner.
pub struct AsyncRegistry<T: Clone + Send + 'static> {
    entries: DashMap<RequestId, Entry<T>>,
}

impl<T: Clone + Send + 'static> Default for AsyncRegistry<T> {
    fn default() -> Self {
        Self { entries: DashMap::new() }
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for AsyncRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRegistry").field("size", &self.entries.len()).finish()
    }
}

impl<T: Clone + Send + 'static> AsyncRegistry<T> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a fresh, pending response under `id`, owned by `owner`.
    pub fn store(&self, owner: impl Into<String>, id: RequestId) -> AsyncResponse<T> {
        let response = AsyncResponse::new();
        self.entries.insert(id, (owner.into(), response.clone()));
        response
    }

    /// Park an already-constructed response (one a handler built and
    /// possibly already armed its own timeout on) under `id`.
    pub fn park(&self, owner: impl Into<String>, id: RequestId, response: AsyncResponse<T>) {
        self.entries.insert(id, (owner.into(), response));
    }

    /// The response parked under `id`, if any.
    pub fn retrieve(&self, id: &RequestId) -> Option<AsyncResponse<T>> {
        self.entries.get(id).map(|entry| entry.1.clone())
    }

    /// Drop the entry for `id` without settling it. Used once its terminal
    /// reply has already been written to the wire.
    pub fn remove(&self, id: &RequestId) {
        self.entries.remove(id);
    }

    /// Settle `id` with a successful value, then remove it.
    pub fn complete(&self, id: &RequestId, value: T) {
        match self.entries.get(id) {
            Some(entry) => {
                entry.1.complete(value);
            }
            None => warn!(%id, "complete on unknown registry entry, ignored"),
        }
        self.remove(id);
    }

    /// Settle `id` with a rejection, then remove it.
    pub fn reject(&self, id: &RequestId, reason: impl Into<String>) {
        match self.entries.get(id) {
            Some(entry) => {
                entry.1.reject(reason);
            }
            None => warn!(%id, "reject on unknown registry entry, ignored"),
        }
        self.remove(id);
    }

    /// Settle `id` as cancelled, then remove it.
    pub fn cancel(&self, id: &RequestId, reason: impl Into<String>) {
        match self.entries.get(id) {
            Some(entry) => {
                entry.1.cancel(reason);
            }
            None => warn!(%id, "cancel on unknown registry entry, ignored"),
        }
        self.remove(id);
    }

    /// Number of entries currently parked.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Drop every entry without settling any of them.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Ids currently owned by `owner`.
    pub fn for_owner(&self, owner: &str) -> Vec<RequestId> {
        self.entries.iter().filter(|e| e.value().0 == owner).map(|e| e.key().clone()).collect()
    }

    /// Cancel and remove every entry owned by `owner`. Used when a session
    /// closes: its in-flight deferrals should not hang forever.
    pub fn release(&self, owner: &str, reason: impl Into<String>) {
        let reason = reason.into();
        for id in self.for_owner(owner) {
            self.cancel(&id, reason.clone());
        }
    }
}

/// Elicitation `Defer` replies, keyed by request id. Accepted values must
/// still be validated against the originating schema before the value
/// stored here is written to the wire — the coordinator does this at
/// settlement time, not at `complete`.
pub type ElicitationRegistry = AsyncRegistry<Value>;

/// Human-in-the-loop `Defer` replies, keyed by request id.
pub type HumanInTheLoopRegistry = AsyncRegistry<bool>;

#[allow(dead_code)]
fn _assert_send_sync<T: Send + Sync>() {}
#[allow(dead_code)]
fn _assertions() {
    _assert_send_sync::<Arc<ElicitationRegistry>>();
    _assert_send_sync::<Arc<HumanInTheLoopRegistry>>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::async_response::AsyncOutcome;

    fn id(n: i64) -> RequestId {
        RequestId::Number(n)
    }

    #[test]
    fn store_then_complete_settles_and_removes() {
        let registry: AsyncRegistry<u32> = AsyncRegistry::new();
        let response = registry.store("session-a", id(1));
        registry.complete(&id(1), 42);
        assert_eq!(registry.size(), 0);
        assert!(matches!(response.outcome(), AsyncOutcome::Completed(42)));
    }

    #[test]
    fn unknown_id_operations_are_warned_no_ops() {
        let registry: AsyncRegistry<u32> = AsyncRegistry::new();
        registry.complete(&id(99), 1);
        registry.reject(&id(99), "x");
        registry.cancel(&id(99), "x");
        assert_eq!(registry.size(), 0);
    }

    #[test]
    fn owner_scopes_are_independent() {
        let registry: AsyncRegistry<u32> = AsyncRegistry::new();
        registry.store("a", id(1));
        registry.store("b", id(2));
        assert_eq!(registry.for_owner("a"), vec![id(1)]);
        registry.release("a", "session closed");
        assert_eq!(registry.size(), 1);
        assert_eq!(registry.for_owner("b"), vec![id(2)]);
    }

    #[test]
    fn human_in_the_loop_approve_and_deny() {
        let registry: HumanInTheLoopRegistry = AsyncRegistry::new();
        let approved = registry.store("s", id(1));
        registry.complete(&id(1), true);
        assert!(matches!(approved.outcome(), AsyncOutcome::Completed(true)));

        let denied = registry.store("s", id(2));
        registry.reject(&id(2), "not allowed");
        assert!(matches!(denied.outcome(), AsyncOutcome::Rejected(_)));
    }
}
