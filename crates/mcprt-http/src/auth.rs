//! The seam between HTTP transports and whatever OAuth machinery a caller
//! wires in. `mcprt-http` never depends on `mcprt-auth` directly — a session
//! builder supplies a [`TokenProvider`] implementation at construction time.

use std::fmt;

use async_trait::async_trait;

use mcprt_transport::TransportResult;

/// Supplies `Authorization` header values for outbound requests and can be
/// asked to refresh one after a 401.
///
/// Implementations return the *complete* header value (e.g. `"Bearer
/// abc123"` or `"DPoP abc123"`), already carrying the right scheme for the
/// token's type — transports never hardcode `"Bearer "` themselves.
#[async_trait]
pub trait TokenProvider: Send + Sync + fmt::Debug {
    /// The `Authorization` header value to attach to the next request, if
    /// any.
    async fn token(&self) -> Option<String>;

    /// Force a refresh after a 401 and return the new header value.
    /// Transports call this at most once per request; a second 401 is
    /// terminal.
    async fn refresh(&self) -> TransportResult<String>;
}

/// A [`TokenProvider`] for servers that need no authentication.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuth;

#[async_trait]
impl TokenProvider for NoAuth {
    async fn token(&self) -> Option<String> {
        None
    }

    async fn refresh(&self) -> TransportResult<String> {
        Err(mcprt_transport::TransportError::Unauthorized(
            "server requires authentication but no token provider is configured".into(),
        ))
    }
}

/// A [`TokenProvider`] backed by one fixed, never-refreshed bearer token —
/// useful for static API keys and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Option<String> {
        Some(format!("Bearer {}", self.0))
    }

    async fn refresh(&self) -> TransportResult<String> {
        Err(mcprt_transport::TransportError::Unauthorized("static token cannot be refreshed".into()))
    }
}
