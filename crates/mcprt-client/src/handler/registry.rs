//! Single-slot-per-kind handler registration.
//!
//! Grounded on the teacher's `HandlerRegistry` (`handlers.rs`): one optional
//! slot per server-initiated request kind, `Debug`, registered once and read
//! on every inbound dispatch. Progress and logging are plain observers
//! (spec §4.6 routes `notifications/progress`/`notifications/message` to
//! "observers", not request/response handlers), so they accumulate rather
//! than replace.

use std::fmt;
use std::sync::{Arc, Mutex};

use mcprt_types::{CreateMessageRequest, CreateMessageResult};
use serde_json::Value;

use crate::async_response::AsyncResponse;
use crate::error::HandlerError;

use super::guard::{Guard, GuardChain};
use super::{
    AfterHook, BeforeHook, ElicitationHandler, ElicitationRequest, HandlerResult, HumanInTheLoopHandler,
    HumanInTheLoopResult, SamplingHandler,
};

type Observer = Arc<dyn Fn(Value) + Send + Sync>;
type SamplingOutcome = HandlerResult<CreateMessageResult, AsyncResponse<CreateMessageResult>>;
type ElicitationOutcome = HandlerResult<Value, AsyncResponse<Value>>;

/// Where the coordinator keeps registered handlers, their guard chains and
/// before/after hooks, and plain-observer notifications.
#[derive(Default)]
pub struct HandlerSlots {
    sampling: Mutex<Option<Arc<dyn SamplingHandler>>>,
    elicitation: Mutex<Option<Arc<dyn ElicitationHandler>>>,
    human_in_the_loop: Mutex<Option<Arc<dyn HumanInTheLoopHandler>>>,
    progress: Mutex<Vec<Observer>>,
    logging: Mutex<Vec<Observer>>,
    resource_updates: Mutex<Vec<Observer>>,

    sampling_guards: Mutex<GuardChain<CreateMessageRequest>>,
    sampling_before: Mutex<Vec<BeforeHook<CreateMessageRequest>>>,
    sampling_after: Mutex<Vec<AfterHook<SamplingOutcome>>>,

    elicitation_guards: Mutex<GuardChain<ElicitationRequest>>,
    elicitation_before: Mutex<Vec<BeforeHook<ElicitationRequest>>>,
    elicitation_after: Mutex<Vec<AfterHook<ElicitationOutcome>>>,

    human_in_the_loop_guards: Mutex<GuardChain<String>>,
    human_in_the_loop_before: Mutex<Vec<BeforeHook<String>>>,
    human_in_the_loop_after: Mutex<Vec<AfterHook<HumanInTheLoopResult>>>,
}

impl fmt::Debug for HandlerSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSlots")
            .field("has_sampling", &self.has_sampling())
            .field("has_elicitation", &self.has_elicitation())
            .field("has_human_in_the_loop", &self.has_human_in_the_loop())
            .field("progress_observers", &self.progress.lock().unwrap_or_else(|e| e.into_inner()).len())
            .field("logging_observers", &self.logging.lock().unwrap_or_else(|e| e.into_inner()).len())
            .finish()
    }
}

impl HandlerSlots {
    /// No handlers or observers registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sampling handler, replacing any previous one.
    pub fn on_sampling(&self, handler: Arc<dyn SamplingHandler>) {
        *self.sampling.lock().unwrap_or_else(|e| e.into_inner()) = Some(handler);
    }

    /// Register the elicitation handler, replacing any previous one.
    pub fn on_elicitation(&self, handler: Arc<dyn ElicitationHandler>) {
        *self.elicitation.lock().unwrap_or_else(|e| e.into_inner()) = Some(handler);
    }

    /// Register the human-in-the-loop handler, replacing any previous one.
    pub fn on_human_in_the_loop(&self, handler: Arc<dyn HumanInTheLoopHandler>) {
        *self.human_in_the_loop.lock().unwrap_or_else(|e| e.into_inner()) = Some(handler);
    }

    /// Add a progress observer. Called with the raw `notifications/progress`
    /// params for every such notification received.
    pub fn on_progress(&self, observer: Observer) {
        self.progress.lock().unwrap_or_else(|e| e.into_inner()).push(observer);
    }

    /// Add a logging observer. Called with the raw `notifications/message`
    /// params for every such notification received.
    pub fn on_logging(&self, observer: Observer) {
        self.logging.lock().unwrap_or_else(|e| e.into_inner()).push(observer);
    }

    /// Add a resource-update observer. Called with the raw
    /// `notifications/resources/updated` params.
    pub fn on_resource_update(&self, observer: Observer) {
        self.resource_updates.lock().unwrap_or_else(|e| e.into_inner()).push(observer);
    }

    /// Append a guard to the sampling guard chain, run in declaration order
    /// before every `sampling/createMessage` dispatch reaches the handler.
    pub fn add_sampling_guard(&self, guard: Guard<CreateMessageRequest>) {
        let mut chain = self.sampling_guards.lock().unwrap_or_else(|e| e.into_inner());
        *chain = std::mem::take(&mut *chain).then(guard);
    }

    /// Run the sampling guard chain against `request`.
    pub fn check_sampling(&self, request: &CreateMessageRequest) -> Result<(), HandlerError> {
        self.sampling_guards.lock().unwrap_or_else(|e| e.into_inner()).check(request)
    }

    /// Register a hook run before every sampling dispatch, ahead of its
    /// guards and `handle`.
    pub fn on_sampling_before(&self, hook: BeforeHook<CreateMessageRequest>) {
        self.sampling_before.lock().unwrap_or_else(|e| e.into_inner()).push(hook);
    }

    /// Run every registered sampling before-hook.
    pub fn run_sampling_before(&self, request: &CreateMessageRequest) {
        for hook in self.sampling_before.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            hook(request);
        }
    }

    /// Register a hook run after a sampling dispatch settles, whether it was
    /// accepted, rejected, or deferred.
    pub fn on_sampling_after(&self, hook: AfterHook<SamplingOutcome>) {
        self.sampling_after.lock().unwrap_or_else(|e| e.into_inner()).push(hook);
    }

    /// Run every registered sampling after-hook.
    pub fn run_sampling_after(&self, outcome: &SamplingOutcome) {
        for hook in self.sampling_after.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            hook(outcome);
        }
    }

    /// Append a guard to the elicitation guard chain.
    pub fn add_elicitation_guard(&self, guard: Guard<ElicitationRequest>) {
        let mut chain = self.elicitation_guards.lock().unwrap_or_else(|e| e.into_inner());
        *chain = std::mem::take(&mut *chain).then(guard);
    }

    /// Run the elicitation guard chain against `request`.
    pub fn check_elicitation(&self, request: &ElicitationRequest) -> Result<(), HandlerError> {
        self.elicitation_guards.lock().unwrap_or_else(|e| e.into_inner()).check(request)
    }

    /// Register a hook run before every elicitation dispatch.
    pub fn on_elicitation_before(&self, hook: BeforeHook<ElicitationRequest>) {
        self.elicitation_before.lock().unwrap_or_else(|e| e.into_inner()).push(hook);
    }

    /// Run every registered elicitation before-hook.
    pub fn run_elicitation_before(&self, request: &ElicitationRequest) {
        for hook in self.elicitation_before.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            hook(request);
        }
    }

    /// Register a hook run after an elicitation dispatch settles.
    pub fn on_elicitation_after(&self, hook: AfterHook<ElicitationOutcome>) {
        self.elicitation_after.lock().unwrap_or_else(|e| e.into_inner()).push(hook);
    }

    /// Run every registered elicitation after-hook.
    pub fn run_elicitation_after(&self, outcome: &ElicitationOutcome) {
        for hook in self.elicitation_after.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            hook(outcome);
        }
    }

    /// Append a guard to the human-in-the-loop guard chain. The guarded
    /// value is the confirmation's description text.
    pub fn add_human_in_the_loop_guard(&self, guard: Guard<String>) {
        let mut chain = self.human_in_the_loop_guards.lock().unwrap_or_else(|e| e.into_inner());
        *chain = std::mem::take(&mut *chain).then(guard);
    }

    /// Run the human-in-the-loop guard chain against `description`.
    pub fn check_human_in_the_loop(&self, description: &str) -> Result<(), HandlerError> {
        self.human_in_the_loop_guards.lock().unwrap_or_else(|e| e.into_inner()).check(&description.to_string())
    }

    /// Register a hook run before every human-in-the-loop confirmation.
    pub fn on_human_in_the_loop_before(&self, hook: BeforeHook<String>) {
        self.human_in_the_loop_before.lock().unwrap_or_else(|e| e.into_inner()).push(hook);
    }

    /// Run every registered human-in-the-loop before-hook.
    pub fn run_human_in_the_loop_before(&self, description: &str) {
        for hook in self.human_in_the_loop_before.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            hook(&description.to_string());
        }
    }

    /// Register a hook run after a human-in-the-loop confirmation settles.
    pub fn on_human_in_the_loop_after(&self, hook: AfterHook<HumanInTheLoopResult>) {
        self.human_in_the_loop_after.lock().unwrap_or_else(|e| e.into_inner()).push(hook);
    }

    /// Run every registered human-in-the-loop after-hook.
    pub fn run_human_in_the_loop_after(&self, outcome: &HumanInTheLoopResult) {
        for hook in self.human_in_the_loop_after.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            hook(outcome);
        }
    }

    /// Whether a sampling handler is registered (drives capability
    /// negotiation in `initialize`, spec §4.6 step 2).
    pub fn has_sampling(&self) -> bool {
        self.sampling.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Whether an elicitation handler is registered.
    pub fn has_elicitation(&self) -> bool {
        self.elicitation.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Whether a human-in-the-loop handler is registered.
    pub fn has_human_in_the_loop(&self) -> bool {
        self.human_in_the_loop.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// The registered sampling handler, if any.
    pub fn sampling(&self) -> Option<Arc<dyn SamplingHandler>> {
        self.sampling.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The registered elicitation handler, if any.
    pub fn elicitation(&self) -> Option<Arc<dyn ElicitationHandler>> {
        self.elicitation.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The registered human-in-the-loop handler, if any.
    pub fn human_in_the_loop(&self) -> Option<Arc<dyn HumanInTheLoopHandler>> {
        self.human_in_the_loop.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Notify every registered progress observer.
    pub fn notify_progress(&self, params: Value) {
        for observer in self.progress.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            observer(params.clone());
        }
    }

    /// Notify every registered logging observer.
    pub fn notify_logging(&self, params: Value) {
        for observer in self.logging.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            observer(params.clone());
        }
    }

    /// Notify every registered resource-update observer.
    pub fn notify_resource_update(&self, params: Value) {
        for observer in self.resource_updates.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            observer(params.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_no_handlers() {
        let slots = HandlerSlots::new();
        assert!(!slots.has_sampling());
        assert!(!slots.has_elicitation());
        assert!(!slots.has_human_in_the_loop());
    }

    #[test]
    fn progress_observers_accumulate_rather_than_replace() {
        let slots = HandlerSlots::new();
        let count = Arc::new(Mutex::new(0u32));
        for _ in 0..3 {
            let count = Arc::clone(&count);
            slots.on_progress(Arc::new(move |_| *count.lock().unwrap() += 1));
        }
        slots.notify_progress(serde_json::json!({}));
        assert_eq!(*count.lock().unwrap(), 3);
    }

    fn sampling_request() -> CreateMessageRequest {
        serde_json::from_value(serde_json::json!({ "messages": [] })).unwrap()
    }

    #[test]
    fn an_empty_sampling_guard_chain_always_passes() {
        let slots = HandlerSlots::new();
        assert!(slots.check_sampling(&sampling_request()).is_ok());
    }

    #[test]
    fn a_sampling_guard_rejection_is_surfaced() {
        let slots = HandlerSlots::new();
        slots.add_sampling_guard(Arc::new(|_: &CreateMessageRequest| Err("denied".to_string())));
        let err = slots.check_sampling(&sampling_request()).unwrap_err();
        assert!(matches!(err, HandlerError::GuardRejected(reason) if reason == "denied"));
    }

    #[test]
    fn sampling_before_and_after_hooks_both_run() {
        let slots = HandlerSlots::new();
        let before_ran = Arc::new(Mutex::new(false));
        let after_ran = Arc::new(Mutex::new(false));

        let before_flag = Arc::clone(&before_ran);
        slots.on_sampling_before(Arc::new(move |_| *before_flag.lock().unwrap() = true));
        let after_flag = Arc::clone(&after_ran);
        slots.on_sampling_after(Arc::new(move |_| *after_flag.lock().unwrap() = true));

        slots.run_sampling_before(&sampling_request());
        slots.run_sampling_after(&HandlerResult::Reject("no".to_string()));

        assert!(*before_ran.lock().unwrap());
        assert!(*after_ran.lock().unwrap());
    }

    #[test]
    fn human_in_the_loop_guard_sees_the_confirmation_description() {
        let slots = HandlerSlots::new();
        slots.add_human_in_the_loop_guard(Arc::new(|description: &String| {
            if description.contains("delete") {
                Err("destructive action blocked".to_string())
            } else {
                Ok(())
            }
        }));
        assert!(slots.check_human_in_the_loop("read a file").is_ok());
        assert!(slots.check_human_in_the_loop("delete the database").is_err());
    }
}
