//! `AsyncResponse<T>`: the deferred-handler completion object (spec §3,
//! §4.7).
//!
//! Where [`crate::Promise`] has two terminal states, `AsyncResponse` has
//! four — a deferred sampling/elicitation/human-in-the-loop reply can
//! complete, be rejected, be cancelled, or time out. Exactly one terminal
//! transition ever succeeds, enforced with the same compare-and-set
//! discipline as `Promise`. The owning timeout timer is cancelled the
//! instant any terminal transition wins, so a late timer firing after an
//! explicit `complete` is a no-op rather than a second transition.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::AbortHandle;

/// The four ways a deferred handler reply can conclude, plus `Pending`.
#[derive(Debug, Clone)]
pub enum AsyncOutcome<T> {
    /// Still waiting.
    Pending,
    /// The deferred work finished normally.
    Completed(T),
    /// The deferred work was rejected with a reason.
    Rejected(String),
    /// The deferred work was explicitly cancelled.
    Cancelled(String),
    /// The deadline elapsed before any other transition won.
    TimedOut,
}

struct Inner<T> {
    outcome: std::sync::Mutex<AsyncOutcome<T>>,
    notify: Notify,
    timer: std::sync::Mutex<Option<AbortHandle>>,
}

/// A deferred completion with at most one terminal transition and an
/// optional, cancellable timeout.
pub struct AsyncResponse<T: Clone + Send + 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: Clone + Send + 'static> Clone for AsyncResponse<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for AsyncResponse<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResponse").finish_non_exhaustive()
    }
}

impl<T: Clone + Send + 'static> Default for AsyncResponse<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> AsyncResponse<T> {
    /// A pending response with no deadline.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                outcome: std::sync::Mutex::new(AsyncOutcome::Pending),
                notify: Notify::new(),
                timer: std::sync::Mutex::new(None),
            }),
        }
    }

    /// Arms a timeout: if no other transition has won by `deadline`, this
    /// response transitions to `TimedOut` on its own. Re-arming replaces any
    /// previously armed timer.
    pub fn arm_timeout(&self, deadline: Duration) {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            this.try_transition(AsyncOutcome::TimedOut);
        });
        let mut timer = self.inner.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = timer.replace(handle.abort_handle()) {
            old.abort();
        }
    }

    /// Arms `deadline` only if nothing is armed yet and the response has not
    /// already settled. Lets a handler arm its own, tighter deadline and
    /// have the coordinator's backstop default skip over it.
    pub fn ensure_timeout(&self, deadline: Duration) {
        let has_timer = self.inner.timer.lock().unwrap_or_else(|e| e.into_inner()).is_some();
        if !has_timer && !self.is_settled() {
            self.arm_timeout(deadline);
        }
    }

    fn try_transition(&self, next: AsyncOutcome<T>) -> bool {
        let won = {
            let mut outcome = self.inner.outcome.lock().unwrap_or_else(|e| e.into_inner());
            if matches!(*outcome, AsyncOutcome::Pending) {
                *outcome = next;
                true
            } else {
                false
            }
        };
        if won {
            if let Some(handle) = self.inner.timer.lock().unwrap_or_else(|e| e.into_inner()).take() {
                handle.abort();
            }
            self.inner.notify.notify_waiters();
        }
        won
    }

    /// Complete normally. Returns `false` if a transition already won.
    pub fn complete(&self, value: T) -> bool {
        self.try_transition(AsyncOutcome::Completed(value))
    }

    /// Reject with a reason. Returns `false` if a transition already won.
    pub fn reject(&self, reason: impl Into<String>) -> bool {
        self.try_transition(AsyncOutcome::Rejected(reason.into()))
    }

    /// Cancel with a reason. Returns `false` if a transition already won.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        self.try_transition(AsyncOutcome::Cancelled(reason.into()))
    }

    /// Current outcome, without blocking.
    pub fn outcome(&self) -> AsyncOutcome<T> {
        self.inner.outcome.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Whether a terminal transition has already won.
    pub fn is_settled(&self) -> bool {
        !matches!(self.outcome(), AsyncOutcome::Pending)
    }

    /// Await a terminal outcome.
    pub async fn wait(&self) -> AsyncOutcome<T> {
        loop {
            let outcome = self.outcome();
            if !matches!(outcome, AsyncOutcome::Pending) {
                return outcome;
            }
            self.inner.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_transition_wins() {
        let r = AsyncResponse::<u32>::new();
        assert!(r.complete(1));
        assert!(!r.reject("late"));
        assert!(matches!(r.outcome(), AsyncOutcome::Completed(1)));
    }

    #[tokio::test]
    async fn timeout_fires_when_nothing_else_settles() {
        let r = AsyncResponse::<u32>::new();
        r.arm_timeout(Duration::from_millis(5));
        let outcome = r.wait().await;
        assert!(matches!(outcome, AsyncOutcome::TimedOut));
    }

    #[tokio::test]
    async fn completing_before_deadline_cancels_the_timer() {
        let r = AsyncResponse::<u32>::new();
        r.arm_timeout(Duration::from_secs(5));
        assert!(r.complete(10));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(matches!(r.outcome(), AsyncOutcome::Completed(10)));
    }
}
