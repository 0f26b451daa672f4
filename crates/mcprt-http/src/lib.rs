//! Client-side HTTP transports: the legacy two-endpoint SSE carrier and the
//! single-endpoint streamable HTTP carrier.

#![warn(missing_docs)]

pub mod auth;
pub mod config;
mod sse;
mod sse_transport;
mod streamable;

pub use auth::{NoAuth, StaticToken, TokenProvider};
pub use config::{HttpConfig, RetryPolicy};
pub use sse::{SseDecoder, SseEvent};
pub use sse_transport::SseTransport;
pub use streamable::StreamableHttpTransport;
