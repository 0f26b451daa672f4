//! Session coordination, the handler runtime, and the async primitives that
//! back deferred server-initiated requests (spec §3, §4.6, §4.7, §4.8).
//!
//! Built on top of `mcprt_transport::Transport` and
//! `mcprt_transport::pending::PendingRequestTable`. This crate owns the
//! `initialize` handshake, server-initiated request dispatch
//! (`sampling/createMessage`, `elicitation/create`), and the registries a
//! host application resolves deferred handler replies through.

pub mod async_response;
pub mod coordinator;
pub mod error;
pub mod handler;
pub mod promise;
pub mod registry;
pub mod state;

pub use async_response::{AsyncOutcome, AsyncResponse};
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use error::HandlerError;
pub use handler::{
    AfterHook, BeforeHook, ElicitationHandler, ElicitationRequest, Guard, GuardChain, HandlerResult, HandlerSlots,
    HumanInTheLoopHandler, HumanInTheLoopResult, MissingRequired, Options, SamplingHandler, DEFAULT_DEFER_TIMEOUT,
};
pub use promise::Promise;
pub use registry::{AsyncRegistry, ElicitationRegistry, HumanInTheLoopRegistry};
pub use state::SessionState;
