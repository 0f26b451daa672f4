//! `mcprt`: the facade crate for the MCP client runtime. Ties a
//! [`mcprt_transport::Transport`], [`mcprt_client::Coordinator`], and (for
//! HTTP carriers) `mcprt-auth`'s OAuth 2.1 subsystem together behind one
//! [`Session`] a host application drives.
//!
//! This crate never installs a `tracing` subscriber itself — every other
//! crate in the workspace only emits events. [`tracing_directive`] is the
//! one piece of environment-driven behavior spec §6 calls for: it reads
//! `MCPRT_DEBUG` so a host building its own subscriber can honor the same
//! convention the rest of this runtime does.

#![warn(missing_docs)]

pub mod oauth;
pub mod session;
pub mod transports;

pub use mcprt_client::{
    AsyncOutcome, AsyncResponse, Coordinator, CoordinatorConfig, ElicitationHandler, Guard, GuardChain, HandlerError,
    HandlerResult, HumanInTheLoopHandler, HumanInTheLoopResult, Options, Promise, SamplingHandler, SessionState,
};
pub use mcprt_core::{version, McprtError};
pub use mcprt_http::HttpConfig;
pub use mcprt_stdio::StdioConfig;
pub use oauth::{GrantType, OAuthConfig};
pub use session::{Session, SessionConfig, TransportConfig};
pub use transports::Registry;

/// Frequently used items, for `use mcprt::prelude::*;`.
pub mod prelude {
    pub use crate::oauth::{GrantType, OAuthConfig};
    pub use crate::session::{Session, SessionConfig, TransportConfig};
    pub use crate::transports::Registry;
    pub use mcprt_client::{ElicitationHandler, HandlerResult, HumanInTheLoopHandler, HumanInTheLoopResult, SamplingHandler};
    pub use mcprt_core::McprtError;
}

/// The `tracing_subscriber::EnvFilter` default directive this runtime's
/// crates expect a host's subscriber to honor: `"debug"` when `MCPRT_DEBUG`
/// is set to `1`, `"info"` otherwise. Read once, not cached — callers that
/// want session-construction-time semantics should call this before
/// building their subscriber.
#[must_use]
pub fn tracing_directive() -> &'static str {
    match std::env::var("MCPRT_DEBUG").as_deref() {
        Ok("1") => "debug",
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_defaults_to_info() {
        // SAFETY: test-only, single-threaded access to this process's env.
        unsafe { std::env::remove_var("MCPRT_DEBUG") };
        assert_eq!(tracing_directive(), "info");
    }

    #[test]
    fn directive_is_debug_when_mcprt_debug_is_set() {
        // SAFETY: test-only, single-threaded access to this process's env.
        unsafe { std::env::set_var("MCPRT_DEBUG", "1") };
        assert_eq!(tracing_directive(), "debug");
        unsafe { std::env::remove_var("MCPRT_DEBUG") };
    }
}
