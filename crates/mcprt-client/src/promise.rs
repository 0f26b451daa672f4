//! `Promise<T>`: a single-settlement value with callback and await support
//! (spec §3).
//!
//! Settlement is compare-and-set: whichever of `fulfill`/`reject` runs first
//! wins, later calls are no-ops. Callbacks registered before settlement are
//! queued and fired, in registration order, once the promise settles;
//! callbacks registered after settlement fire immediately. Either way they
//! run outside the internal lock so a callback that itself calls back into
//! this promise (or another one) cannot deadlock.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Clone)]
enum Settlement<T> {
    Pending,
    Fulfilled(T),
    Rejected(String),
}

type ThenCb<T> = Box<dyn FnOnce(T) + Send + 'static>;
type CatchCb = Box<dyn FnOnce(String) + Send + 'static>;

struct Inner<T> {
    settlement: std::sync::Mutex<Settlement<T>>,
    then_cbs: std::sync::Mutex<Vec<ThenCb<T>>>,
    catch_cbs: std::sync::Mutex<Vec<CatchCb>>,
    notify: Notify,
}

/// A value that settles at most once, with both callback and async-await
/// access patterns.
pub struct Promise<T: Clone + Send + 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: Clone + Send + 'static> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.settlement.lock().unwrap_or_else(|e| e.into_inner()) {
            Settlement::Pending => "Pending",
            Settlement::Fulfilled(_) => "Fulfilled",
            Settlement::Rejected(_) => "Rejected",
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}

impl<T: Clone + Send + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// A fresh, pending promise.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                settlement: std::sync::Mutex::new(Settlement::Pending),
                then_cbs: std::sync::Mutex::new(Vec::new()),
                catch_cbs: std::sync::Mutex::new(Vec::new()),
                notify: Notify::new(),
            }),
        }
    }

    /// Settle with a value. A no-op if already settled.
    pub fn fulfill(&self, value: T) {
        let became_fulfilled = {
            let mut settlement = self.inner.settlement.lock().unwrap_or_else(|e| e.into_inner());
            if matches!(*settlement, Settlement::Pending) {
                *settlement = Settlement::Fulfilled(value.clone());
                true
            } else {
                false
            }
        };
        if !became_fulfilled {
            return;
        }
        self.inner.notify.notify_waiters();
        let callbacks = std::mem::take(&mut *self.inner.then_cbs.lock().unwrap_or_else(|e| e.into_inner()));
        for cb in callbacks {
            cb(value.clone());
        }
    }

    /// Settle with a rejection reason. A no-op if already settled.
    pub fn reject(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let became_rejected = {
            let mut settlement = self.inner.settlement.lock().unwrap_or_else(|e| e.into_inner());
            if matches!(*settlement, Settlement::Pending) {
                *settlement = Settlement::Rejected(reason.clone());
                true
            } else {
                false
            }
        };
        if !became_rejected {
            return;
        }
        self.inner.notify.notify_waiters();
        let callbacks = std::mem::take(&mut *self.inner.catch_cbs.lock().unwrap_or_else(|e| e.into_inner()));
        for cb in callbacks {
            cb(reason.clone());
        }
    }

    /// Register a success callback. Fires immediately if already fulfilled.
    pub fn then(&self, cb: impl FnOnce(T) + Send + 'static) {
        let immediate = {
            let settlement = self.inner.settlement.lock().unwrap_or_else(|e| e.into_inner());
            match &*settlement {
                Settlement::Fulfilled(value) => Some(value.clone()),
                Settlement::Pending => {
                    drop(settlement);
                    self.inner.then_cbs.lock().unwrap_or_else(|e| e.into_inner()).push(Box::new(cb));
                    None
                }
                Settlement::Rejected(_) => None,
            }
        };
        if let Some(value) = immediate {
            cb(value);
        }
    }

    /// Register a rejection callback. Fires immediately if already rejected.
    pub fn catch(&self, cb: impl FnOnce(String) + Send + 'static) {
        let immediate = {
            let settlement = self.inner.settlement.lock().unwrap_or_else(|e| e.into_inner());
            match &*settlement {
                Settlement::Rejected(reason) => Some(reason.clone()),
                Settlement::Pending => {
                    drop(settlement);
                    self.inner.catch_cbs.lock().unwrap_or_else(|e| e.into_inner()).push(Box::new(cb));
                    None
                }
                Settlement::Fulfilled(_) => None,
            }
        };
        if let Some(reason) = immediate {
            cb(reason);
        }
    }

    /// Await settlement, optionally bounded by `timeout`.
    ///
    /// Returns `Err(reason)` on rejection and also on timeout elapsing
    /// (the promise itself is left untouched — a caller that owns both ends
    /// may still `fulfill`/`reject` it later).
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<T, String> {
        loop {
            {
                let settlement = self.inner.settlement.lock().unwrap_or_else(|e| e.into_inner());
                match &*settlement {
                    Settlement::Fulfilled(value) => return Ok(value.clone()),
                    Settlement::Rejected(reason) => return Err(reason.clone()),
                    Settlement::Pending => {}
                }
            }
            let notified = self.inner.notify.notified();
            match timeout {
                Some(d) => {
                    if tokio::time::timeout(d, notified).await.is_err() {
                        return Err("promise wait timed out".to_string());
                    }
                }
                None => notified.await,
            }
        }
    }

    /// `true` once `fulfill` or `reject` has been called.
    pub fn is_settled(&self) -> bool {
        !matches!(*self.inner.settlement.lock().unwrap_or_else(|e| e.into_inner()), Settlement::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn settles_once_fulfill_wins_first() {
        let p = Promise::<u32>::new();
        p.fulfill(1);
        p.fulfill(2);
        assert!(p.is_settled());
    }

    #[test]
    fn then_fires_immediately_after_settlement() {
        let p = Promise::<u32>::new();
        p.fulfill(7);
        let seen = Arc::new(AtomicU32::new(0));
        let seen2 = Arc::clone(&seen);
        p.then(move |v| seen2.store(v, Ordering::SeqCst));
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn then_queued_before_settlement_fires_on_fulfill() {
        let p = Promise::<u32>::new();
        let seen = Arc::new(AtomicU32::new(0));
        let seen2 = Arc::clone(&seen);
        p.then(move |v| seen2.store(v, Ordering::SeqCst));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        p.fulfill(9);
        assert_eq!(seen.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn wait_resolves_after_fulfill_from_another_task() {
        let p = Promise::<u32>::new();
        let p2 = p.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            p2.fulfill(42);
        });
        assert_eq!(p.wait(None).await, Ok(42));
    }

    #[tokio::test]
    async fn wait_times_out_without_settling_the_promise() {
        let p = Promise::<u32>::new();
        let err = p.wait(Some(Duration::from_millis(5))).await.unwrap_err();
        assert!(err.contains("timed out"));
        assert!(!p.is_settled());
    }

    #[tokio::test]
    async fn reject_is_observed_by_wait() {
        let p = Promise::<u32>::new();
        p.reject("nope");
        assert_eq!(p.wait(None).await, Err("nope".to_string()));
    }
}
