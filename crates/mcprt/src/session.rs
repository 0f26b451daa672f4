//! `Session`: wires a transport, the coordinator, and (for HTTP carriers)
//! OAuth together into the one object a host application drives (spec §2,
//! §4.6, §6 "External interfaces").
//!
//! Grounded on the teacher's top-level client facade: a single builder call
//! that resolves which transport to speak, bootstraps auth if the transport
//! needs it, and hands back something whose methods are the MCP method
//! table in §6 rather than raw `request`/`notify` calls.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use mcprt_client::{Coordinator, CoordinatorConfig};
use mcprt_core::methods;
use mcprt_core::McprtError;
use mcprt_http::{HttpConfig, SseTransport, StreamableHttpTransport};
use mcprt_stdio::{StdioConfig, StdioTransport};
use mcprt_transport::Transport;

use crate::oauth::{self, OAuthConfig};
use crate::transports::Registry;

/// Which carrier a [`Session`] speaks, and that carrier's configuration.
pub enum TransportConfig {
    /// A subprocess speaking newline-delimited JSON-RPC over stdio.
    Stdio(StdioConfig),
    /// The legacy two-endpoint SSE carrier.
    Sse(HttpConfig),
    /// The single-endpoint streamable HTTP carrier.
    StreamableHttp(HttpConfig),
    /// A transport produced by a caller-registered factory in `registry`.
    Custom {
        /// The name it was registered under.
        name: String,
        /// Opaque configuration handed to the factory.
        config: Value,
    },
}

/// Everything needed to build and start one [`Session`].
pub struct SessionConfig {
    /// Which carrier to speak and how to configure it.
    pub transport: TransportConfig,
    /// Coordinator-level settings (client info, protocol version, timeouts,
    /// roots capability).
    pub coordinator: CoordinatorConfig,
    /// OAuth bootstrap, for HTTP transports protected by it. Ignored for
    /// `TransportConfig::Stdio`.
    pub oauth: Option<OAuthConfig>,
    /// Factories for `TransportConfig::Custom`.
    pub registry: Registry,
}

impl SessionConfig {
    /// A stdio session with otherwise-default coordinator settings.
    pub fn stdio(command: impl Into<String>) -> Self {
        Self {
            transport: TransportConfig::Stdio(StdioConfig::new(command)),
            coordinator: CoordinatorConfig::default(),
            oauth: None,
            registry: Registry::new(),
        }
    }

    /// A streamable-HTTP session pointed at `base_url`, with otherwise
    /// default coordinator settings.
    pub fn streamable_http(base_url: impl Into<String>) -> Self {
        Self {
            transport: TransportConfig::StreamableHttp(HttpConfig::new(base_url)),
            coordinator: CoordinatorConfig::default(),
            oauth: None,
            registry: Registry::new(),
        }
    }

    /// Enable OAuth bootstrap for an HTTP transport.
    #[must_use]
    pub fn with_oauth(mut self, oauth: OAuthConfig) -> Self {
        self.oauth = Some(oauth);
        self
    }
}

/// One live (or not-yet-started) connection to an MCP server: a
/// [`Coordinator`] bound to a concrete transport.
#[derive(Clone)]
pub struct Session {
    coordinator: Arc<Coordinator>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("state", &self.coordinator.state()).finish_non_exhaustive()
    }
}

impl Session {
    /// Build the transport (bootstrapping OAuth first if configured), wrap
    /// it in a [`Coordinator`], and run the `initialize` handshake.
    pub async fn connect(config: SessionConfig) -> Result<Self, McprtError> {
        let transport = Self::build_transport(config.transport, config.oauth.as_ref(), &config.registry).await?;
        let coordinator = Arc::new(Coordinator::new(Arc::from(transport), config.coordinator));
        Arc::clone(&coordinator).start().await?;
        Ok(Self { coordinator })
    }

    async fn build_transport(
        transport: TransportConfig,
        oauth: Option<&OAuthConfig>,
        registry: &Registry,
    ) -> Result<Box<dyn Transport>, McprtError> {
        match transport {
            TransportConfig::Stdio(config) => Ok(Box::new(StdioTransport::new(config))),
            TransportConfig::Sse(mut config) => {
                if let Some(oauth) = oauth {
                    config.token_provider = Arc::new(Self::bootstrap_oauth(&config.base_url, oauth).await?);
                }
                Ok(Box::new(SseTransport::new(config)))
            }
            TransportConfig::StreamableHttp(mut config) => {
                if let Some(oauth) = oauth {
                    config.token_provider = Arc::new(Self::bootstrap_oauth(&config.base_url, oauth).await?);
                }
                Ok(Box::new(StreamableHttpTransport::new(config)))
            }
            TransportConfig::Custom { name, config } => registry.create(&name, config),
        }
    }

    async fn bootstrap_oauth(base_url: &str, oauth: &OAuthConfig) -> Result<mcprt_auth::OAuthTokenProvider, McprtError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| McprtError::Transport { message: e.to_string(), status: None })?;
        oauth::bootstrap(http, base_url, oauth).await
    }

    /// Register the sampling handler.
    pub fn on_sampling(&self, handler: Arc<dyn mcprt_client::SamplingHandler>) {
        self.coordinator.on_sampling(handler);
    }

    /// Register the elicitation handler.
    pub fn on_elicitation(&self, handler: Arc<dyn mcprt_client::ElicitationHandler>) {
        self.coordinator.on_elicitation(handler);
    }

    /// Register the human-in-the-loop handler.
    pub fn on_human_in_the_loop(&self, handler: Arc<dyn mcprt_client::HumanInTheLoopHandler>) {
        self.coordinator.on_human_in_the_loop(handler);
    }

    /// Register a progress observer (`notifications/progress`).
    pub fn on_progress(&self, observer: Arc<dyn Fn(Value) + Send + Sync>) {
        self.coordinator.on_progress(observer);
    }

    /// Register a logging observer (`notifications/message`).
    pub fn on_logging(&self, observer: Arc<dyn Fn(Value) + Send + Sync>) {
        self.coordinator.on_logging(observer);
    }

    /// Register a resource-update observer
    /// (`notifications/resources/updated`).
    pub fn on_resource_update(&self, observer: Arc<dyn Fn(Value) + Send + Sync>) {
        self.coordinator.on_resource_update(observer);
    }

    /// Run a human-in-the-loop confirmation gate ahead of a sensitive local
    /// operation. Not a wire method.
    pub async fn guard_human_in_the_loop(&self, description: impl Into<String>) -> Result<(), mcprt_client::HandlerError> {
        self.coordinator.guard_human_in_the_loop(description).await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> mcprt_client::SessionState {
        self.coordinator.state()
    }

    /// Whether the session can currently send/receive.
    pub fn alive(&self) -> bool {
        self.coordinator.alive()
    }

    /// Tear the session down. Idempotent.
    pub async fn close(&self) -> Result<(), McprtError> {
        self.coordinator.stop().await
    }

    /// `close` then reconnect and re-run `initialize`.
    pub async fn restart(&self) -> Result<(), McprtError> {
        Arc::clone(&self.coordinator).restart().await
    }

    /// `ping`.
    pub async fn ping(&self) -> Result<(), McprtError> {
        self.coordinator.ping().await
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Option<Value>) -> Result<T, McprtError> {
        let result = self.coordinator.request(method, params, None).await?;
        serde_json::from_value(result).map_err(|e| McprtError::InvalidRequest(format!("malformed {method} result: {e}")))
    }

    /// `tools/list`.
    pub async fn tools_list(&self) -> Result<Value, McprtError> {
        self.call(methods::TOOLS_LIST, None).await
    }

    /// `tools/call`.
    pub async fn tools_call(&self, name: impl Into<String>, arguments: Value) -> Result<Value, McprtError> {
        self.call(methods::TOOLS_CALL, Some(serde_json::json!({ "name": name.into(), "arguments": arguments }))).await
    }

    /// `resources/list`.
    pub async fn resources_list(&self) -> Result<Value, McprtError> {
        self.call(methods::RESOURCES_LIST, None).await
    }

    /// `resources/read`.
    pub async fn resources_read(&self, uri: impl Into<String>) -> Result<Value, McprtError> {
        self.call(methods::RESOURCES_READ, Some(serde_json::json!({ "uri": uri.into() }))).await
    }

    /// `resources/subscribe`.
    pub async fn resources_subscribe(&self, uri: impl Into<String>) -> Result<(), McprtError> {
        self.coordinator.request(methods::RESOURCES_SUBSCRIBE, Some(serde_json::json!({ "uri": uri.into() })), None).await.map(|_| ())
    }

    /// `resources/unsubscribe`.
    pub async fn resources_unsubscribe(&self, uri: impl Into<String>) -> Result<(), McprtError> {
        self.coordinator
            .request(methods::RESOURCES_UNSUBSCRIBE, Some(serde_json::json!({ "uri": uri.into() })), None)
            .await
            .map(|_| ())
    }

    /// `resources/templates/list`.
    pub async fn resources_templates_list(&self) -> Result<Value, McprtError> {
        self.call(methods::RESOURCES_TEMPLATES_LIST, None).await
    }

    /// `prompts/list`.
    pub async fn prompts_list(&self) -> Result<Value, McprtError> {
        self.call(methods::PROMPTS_LIST, None).await
    }

    /// `prompts/get`.
    pub async fn prompts_get(&self, name: impl Into<String>, arguments: Option<Value>) -> Result<Value, McprtError> {
        let mut params = serde_json::json!({ "name": name.into() });
        if let Some(arguments) = arguments {
            params["arguments"] = arguments;
        }
        self.call(methods::PROMPTS_GET, Some(params)).await
    }

    /// `completion/complete`.
    pub async fn completion_complete(&self, params: Value) -> Result<Value, McprtError> {
        self.call(methods::COMPLETION_COMPLETE, Some(params)).await
    }

    /// `logging/setLevel`.
    pub async fn logging_set_level(&self, level: mcprt_types::LogLevel) -> Result<(), McprtError> {
        self.coordinator.request(methods::LOGGING_SET_LEVEL, Some(serde_json::json!({ "level": level })), None).await.map(|_| ())
    }

    /// Deadline-bounded request, for callers that need a tighter (or
    /// looser) timeout than [`CoordinatorConfig::request_timeout`].
    pub async fn request_with_timeout(&self, method: &str, params: Option<Value>, timeout: Duration) -> Result<Value, McprtError> {
        self.coordinator.request(method, params, Some(timeout)).await
    }
}
