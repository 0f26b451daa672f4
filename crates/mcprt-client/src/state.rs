//! The session state machine (spec §3, §4.6).
//!
//! `SessionState` tracks the handshake lifecycle; `alive` is a separate flag
//! because a transport can die (connection dropped) without the coordinator
//! having been asked to `stop` — `alive` answers "can I still send", while
//! `state` answers "have I finished handshaking".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Where a [`crate::Coordinator`] is in its handshake lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// `start` has not been called yet.
    Uninitialized,
    /// The transport is connecting and the `initialize` handshake is in flight.
    Connecting,
    /// `initialize` succeeded and `notifications/initialized` was sent.
    Initialized,
    /// `stop` was called; the transport is tearing down.
    Closing,
    /// The transport is torn down. Terminal until `restart`.
    Closed,
}

/// Guards `SessionState` transitions and the independent liveness flag.
#[derive(Debug)]
pub struct StateCell {
    state: Mutex<SessionState>,
    alive: AtomicBool,
}

impl Default for StateCell {
    fn default() -> Self {
        Self { state: Mutex::new(SessionState::Uninitialized), alive: AtomicBool::new(false) }
    }
}

impl StateCell {
    /// Current state.
    pub fn get(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Unconditionally set the state. Transition legality is the
    /// coordinator's responsibility; this cell just holds the value.
    pub fn set(&self, next: SessionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
    }

    /// Whether the session is presently usable for `send`/`request`.
    pub fn alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub(crate) fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninitialized_and_not_alive() {
        let cell = StateCell::default();
        assert_eq!(cell.get(), SessionState::Uninitialized);
        assert!(!cell.alive());
    }

    #[test]
    fn set_and_get_round_trip() {
        let cell = StateCell::default();
        cell.set(SessionState::Initialized);
        cell.set_alive(true);
        assert_eq!(cell.get(), SessionState::Initialized);
        assert!(cell.alive());
    }
}
