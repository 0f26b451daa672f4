//! Shared configuration for the SSE and streamable HTTP transports.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{NoAuth, TokenProvider};

/// Backoff between reconnect attempts for the long-lived SSE stream.
#[derive(Debug, Clone)]
pub enum RetryPolicy {
    /// A fixed delay between attempts.
    Fixed {
        /// Delay between attempts.
        interval: Duration,
        /// Give up after this many attempts, or retry forever if `None`.
        max_attempts: Option<u32>,
    },
    /// Doubling delay, capped, with jitter so many clients reconnecting at
    /// once don't all retry in lockstep.
    Exponential {
        /// Delay before the first retry.
        base: Duration,
        /// Ceiling on the computed delay.
        max_delay: Duration,
        /// Give up after this many attempts, or retry forever if `None`.
        max_attempts: Option<u32>,
    },
    /// Never reconnect; one connection failure ends the stream for good.
    Never,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_attempts: Some(10),
        }
    }
}

impl RetryPolicy {
    /// The delay before the given (zero-indexed) attempt, or `None` when
    /// the policy says to stop retrying.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::Fixed { interval, max_attempts } => {
                if max_attempts.is_some_and(|max| attempt >= max) {
                    return None;
                }
                Some(*interval)
            }
            Self::Exponential { base, max_delay, max_attempts } => {
                if max_attempts.is_some_and(|max| attempt >= max) {
                    return None;
                }
                let doubled = base.as_millis().saturating_mul(1u128 << attempt.min(20));
                let capped = doubled.min(max_delay.as_millis());
                // Deterministic jitter derived from the attempt number, so
                // delay() stays a pure function and is easy to test.
                let jitter_range = capped / 4;
                let hash = (attempt as u128).wrapping_mul(6_364_136_223_846_793_005);
                let jitter = if jitter_range > 0 { hash % (jitter_range * 2) } else { 0 };
                let millis = capped.saturating_sub(jitter_range).saturating_add(jitter);
                Some(Duration::from_millis(millis as u64))
            }
            Self::Never => None,
        }
    }
}

/// Configuration shared by [`crate::StreamableHttpTransport`] and
/// [`crate::SseTransport`].
#[derive(Clone)]
pub struct HttpConfig {
    /// Base URL the MCP endpoint is resolved against, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Path of the MCP endpoint, e.g. `/mcp`.
    pub endpoint_path: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Protocol version sent in the `MCP-Protocol-Version` header.
    pub protocol_version: String,
    /// Extra headers merged into every request.
    pub headers: HashMap<String, String>,
    /// Reconnect policy for the long-lived SSE stream.
    pub retry_policy: RetryPolicy,
    /// Bearer token source. Defaults to [`NoAuth`].
    pub token_provider: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConfig")
            .field("base_url", &self.base_url)
            .field("endpoint_path", &self.endpoint_path)
            .field("timeout", &self.timeout)
            .field("protocol_version", &self.protocol_version)
            .finish_non_exhaustive()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            endpoint_path: "/mcp".to_string(),
            timeout: Duration::from_secs(30),
            protocol_version: mcprt_core::version::LATEST_VERSION.to_string(),
            headers: HashMap::new(),
            retry_policy: RetryPolicy::default(),
            token_provider: Arc::new(NoAuth),
        }
    }
}

impl HttpConfig {
    /// Start building a config pointed at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Set the endpoint path.
    #[must_use]
    pub fn endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    /// Supply a token provider for authenticated servers.
    #[must_use]
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = provider;
        self
    }

    pub(crate) fn endpoint_url(&self) -> String {
        format!("{}{}", self.base_url, self.endpoint_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policy_stops_after_max_attempts() {
        let policy = RetryPolicy::Fixed { interval: Duration::from_secs(1), max_attempts: Some(2) };
        assert!(policy.delay(0).is_some());
        assert!(policy.delay(1).is_some());
        assert!(policy.delay(2).is_none());
    }

    #[test]
    fn exponential_policy_grows_and_caps() {
        let policy = RetryPolicy::Exponential {
            base: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            max_attempts: None,
        };
        let first = policy.delay(0).unwrap();
        let later = policy.delay(10).unwrap();
        assert!(first <= Duration::from_millis(125));
        assert!(later <= Duration::from_secs(1));
    }

    #[test]
    fn never_policy_never_retries() {
        assert!(RetryPolicy::Never.delay(0).is_none());
    }
}
