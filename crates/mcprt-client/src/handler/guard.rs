//! The guard chain a handler runs before `execute` (spec §4.7).
//!
//! Guards run in declaration order; the first one that rejects
//! short-circuits the rest and the request never reaches `execute`.

use std::sync::Arc;

use crate::error::HandlerError;

/// One precondition check. Returns `Ok(())` to allow the request through,
/// `Err(reason)` to reject it.
pub type Guard<Req> = Arc<dyn Fn(&Req) -> Result<(), String> + Send + Sync>;

/// An ordered sequence of [`Guard`]s for one handler.
pub struct GuardChain<Req> {
    guards: Vec<Guard<Req>>,
}

impl<Req> Default for GuardChain<Req> {
    fn default() -> Self {
        Self { guards: Vec::new() }
    }
}

impl<Req> GuardChain<Req> {
    /// An empty chain — every request passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a guard, run after every guard already in the chain.
    #[must_use]
    pub fn then(mut self, guard: Guard<Req>) -> Self {
        self.guards.push(guard);
        self
    }

    /// Run every guard in order, stopping at the first rejection.
    pub fn check(&self, request: &Req) -> Result<(), HandlerError> {
        for guard in &self.guards {
            guard(request).map_err(HandlerError::GuardRejected)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn empty_chain_always_passes() {
        let chain: GuardChain<()> = GuardChain::new();
        assert!(chain.check(&()).is_ok());
    }

    #[test]
    fn first_rejection_short_circuits_later_guards() {
        let ran_second = Arc::new(AtomicUsize::new(0));
        let ran_second2 = Arc::clone(&ran_second);
        let chain: GuardChain<()> = GuardChain::new()
            .then(Arc::new(|_: &()| Err("no".to_string())))
            .then(Arc::new(move |_: &()| {
                ran_second2.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        let err = chain.check(&()).unwrap_err();
        assert!(matches!(err, HandlerError::GuardRejected(_)));
        assert_eq!(ran_second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn all_passing_guards_allow_the_request() {
        let chain: GuardChain<u32> =
            GuardChain::new().then(Arc::new(|req: &u32| if *req > 0 { Ok(()) } else { Err("must be positive".into()) }));
        assert!(chain.check(&5).is_ok());
        assert!(chain.check(&0).is_err());
    }
}
