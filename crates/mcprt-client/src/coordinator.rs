//! The session coordinator: the state machine that owns one transport, one
//! pending-request table, and the handler registries built up to answer
//! server-initiated requests (spec §4.6).
//!
//! Grounded on the teacher's `Client<T>` (`client/core.rs`): the same
//! `initialize()` capability-auto-detection and `process_message`
//! dispatch-by-method shape, rebuilt around `mcprt_transport::Transport` and
//! `mcprt_transport::pending::PendingRequestTable` instead of the teacher's
//! `ProtocolClient<T>`, and around the `HandlerResult` `Accept`/`Reject`/
//! `Cancel`/`Defer` union instead of a plain `Result`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use mcprt_core::error::codes;
use mcprt_core::jsonrpc::{classify, encode, Envelope, RequestId};
use mcprt_core::methods;
use mcprt_core::{version, McprtError};
use mcprt_transport::pending::PendingRequestTable;
use mcprt_transport::Transport;
use mcprt_types::{
    ClientCapabilities, ClientInfo, CreateMessageRequest, InitializeResult, RequestedSchema, RootsCapability,
    ServerCapabilities,
};

use crate::handler::{validate_elicitation, HandlerResult, HandlerSlots, DEFAULT_DEFER_TIMEOUT};
use crate::registry::{AsyncRegistry, ElicitationRegistry, HumanInTheLoopRegistry};
use crate::state::{SessionState, StateCell};

/// Parameters that stay fixed for a coordinator's lifetime.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Identifies this client application in `initialize`'s `clientInfo`.
    pub client_info: ClientInfo,
    /// The protocol version this coordinator proposes.
    pub protocol_version: String,
    /// Deadline applied to `request`/`ping`/`start`'s handshake calls when
    /// the caller does not supply its own.
    pub request_timeout: Duration,
    /// Whether this client exposes filesystem roots at all. When `false`,
    /// `initialize` omits the `roots` capability entirely.
    pub roots_enabled: bool,
    /// Whether the client will emit `notifications/roots/list_changed`.
    /// Only meaningful when `roots_enabled` is `true`.
    pub roots_list_changed: bool,
    /// Namespaces this coordinator's entries in the elicitation and
    /// human-in-the-loop registries, so `release` can scope to just this
    /// session.
    pub owner: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            client_info: ClientInfo { name: "mcprt".to_string(), version: env!("CARGO_PKG_VERSION").to_string() },
            protocol_version: version::DEFAULT_VERSION.to_string(),
            request_timeout: Duration::from_secs(30),
            roots_enabled: false,
            roots_list_changed: false,
            owner: "default".to_string(),
        }
    }
}

/// What the handshake negotiated, once `start` succeeds.
#[derive(Debug, Clone)]
struct Handshake {
    protocol_version: String,
    server_capabilities: ServerCapabilities,
}

/// Owns one [`Transport`], drives the `initialize` handshake, correlates
/// requests with responses, and routes server-initiated requests to
/// registered handlers.
pub struct Coordinator {
    transport: Arc<dyn Transport>,
    pending: Arc<PendingRequestTable>,
    state: Arc<StateCell>,
    handlers: Arc<HandlerSlots>,
    elicitation_registry: Arc<ElicitationRegistry>,
    human_in_the_loop_registry: Arc<HumanInTheLoopRegistry>,
    sampling_registry: Arc<AsyncRegistry<mcprt_types::CreateMessageResult>>,
    next_id: AtomicI64,
    config: CoordinatorConfig,
    reader: Mutex<Option<JoinHandle<()>>>,
    handshake: Mutex<Option<Handshake>>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state.get())
            .field("alive", &self.state.alive())
            .field("owner", &self.config.owner)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Build a coordinator over `transport`. Does not connect — call
    /// [`Coordinator::start`].
    pub fn new(transport: Arc<dyn Transport>, config: CoordinatorConfig) -> Self {
        Self {
            transport,
            pending: Arc::new(PendingRequestTable::new()),
            state: Arc::new(StateCell::default()),
            handlers: Arc::new(HandlerSlots::new()),
            elicitation_registry: Arc::new(ElicitationRegistry::new()),
            human_in_the_loop_registry: Arc::new(HumanInTheLoopRegistry::new()),
            sampling_registry: Arc::new(AsyncRegistry::new()),
            next_id: AtomicI64::new(1),
            config,
            reader: Mutex::new(None),
            handshake: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Whether the session can currently send/receive.
    pub fn alive(&self) -> bool {
        self.state.alive()
    }

    /// The protocol version and server capabilities negotiated by `start`,
    /// if the handshake has completed.
    pub fn negotiated(&self) -> Option<(String, ServerCapabilities)> {
        self.handshake
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .map(|h| (h.protocol_version, h.server_capabilities))
    }

    /// Register the sampling handler.
    pub fn on_sampling(&self, handler: Arc<dyn crate::handler::SamplingHandler>) {
        self.handlers.on_sampling(handler);
    }

    /// Register the elicitation handler.
    pub fn on_elicitation(&self, handler: Arc<dyn crate::handler::ElicitationHandler>) {
        self.handlers.on_elicitation(handler);
    }

    /// Register the human-in-the-loop handler.
    pub fn on_human_in_the_loop(&self, handler: Arc<dyn crate::handler::HumanInTheLoopHandler>) {
        self.handlers.on_human_in_the_loop(handler);
    }

    /// Register a progress observer.
    pub fn on_progress(&self, observer: Arc<dyn Fn(Value) + Send + Sync>) {
        self.handlers.on_progress(observer);
    }

    /// Register a logging observer.
    pub fn on_logging(&self, observer: Arc<dyn Fn(Value) + Send + Sync>) {
        self.handlers.on_logging(observer);
    }

    /// Register a resource-update observer.
    pub fn on_resource_update(&self, observer: Arc<dyn Fn(Value) + Send + Sync>) {
        self.handlers.on_resource_update(observer);
    }

    /// Append a guard run before every `sampling/createMessage` dispatch
    /// reaches the registered handler.
    pub fn add_sampling_guard(&self, guard: crate::handler::Guard<CreateMessageRequest>) {
        self.handlers.add_sampling_guard(guard);
    }

    /// Register a hook run before every sampling dispatch.
    pub fn on_sampling_before(&self, hook: crate::handler::BeforeHook<CreateMessageRequest>) {
        self.handlers.on_sampling_before(hook);
    }

    /// Register a hook run after every sampling dispatch settles.
    pub fn on_sampling_after(
        &self,
        hook: crate::handler::AfterHook<HandlerResult<mcprt_types::CreateMessageResult, crate::async_response::AsyncResponse<mcprt_types::CreateMessageResult>>>,
    ) {
        self.handlers.on_sampling_after(hook);
    }

    /// Append a guard run before every `elicitation/create` dispatch reaches
    /// the registered handler.
    pub fn add_elicitation_guard(&self, guard: crate::handler::Guard<crate::handler::ElicitationRequest>) {
        self.handlers.add_elicitation_guard(guard);
    }

    /// Register a hook run before every elicitation dispatch.
    pub fn on_elicitation_before(&self, hook: crate::handler::BeforeHook<crate::handler::ElicitationRequest>) {
        self.handlers.on_elicitation_before(hook);
    }

    /// Register a hook run after every elicitation dispatch settles.
    pub fn on_elicitation_after(
        &self,
        hook: crate::handler::AfterHook<HandlerResult<Value, crate::async_response::AsyncResponse<Value>>>,
    ) {
        self.handlers.on_elicitation_after(hook);
    }

    /// Append a guard run before every human-in-the-loop confirmation. The
    /// guarded value is the confirmation's description text.
    pub fn add_human_in_the_loop_guard(&self, guard: crate::handler::Guard<String>) {
        self.handlers.add_human_in_the_loop_guard(guard);
    }

    /// Register a hook run before every human-in-the-loop confirmation.
    pub fn on_human_in_the_loop_before(&self, hook: crate::handler::BeforeHook<String>) {
        self.handlers.on_human_in_the_loop_before(hook);
    }

    /// Register a hook run after every human-in-the-loop confirmation
    /// settles.
    pub fn on_human_in_the_loop_after(&self, hook: crate::handler::AfterHook<crate::handler::HumanInTheLoopResult>) {
        self.handlers.on_human_in_the_loop_after(hook);
    }

    fn build_client_capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            sampling: self.handlers.has_sampling().then(serde_json::Map::new),
            elicitation: self.handlers.has_elicitation().then(serde_json::Map::new),
            roots: self
                .config
                .roots_enabled
                .then(|| RootsCapability { list_changed: Some(self.config.roots_list_changed) }),
            experimental: None,
        }
    }

    /// Connect the transport, run `initialize`, and send
    /// `notifications/initialized`. Spawns the background reader task that
    /// feeds [`Coordinator::process_inbound`].
    pub async fn start(self: Arc<Self>) -> Result<(), McprtError> {
        if self.state.get() != SessionState::Uninitialized {
            return Err(McprtError::InvalidRequest("start called outside Uninitialized".into()));
        }
        self.state.set(SessionState::Connecting);

        self.transport.connect().await.map_err(|e| McprtError::Transport { message: e.to_string(), status: None })?;
        self.state.set_alive(true);
        Self::spawn_reader(Arc::clone(&self));

        let params = serde_json::json!({
            "protocolVersion": self.config.protocol_version,
            "capabilities": self.build_client_capabilities(),
            "clientInfo": self.config.client_info,
        });
        let result = self.request(methods::INITIALIZE, Some(params), Some(self.config.request_timeout)).await?;
        let initialize_result: InitializeResult = serde_json::from_value(result)
            .map_err(|e| McprtError::InvalidRequest(format!("malformed initialize result: {e}")))?;

        let negotiated = version::negotiate(&self.config.protocol_version, &initialize_result.protocol_version)?;

        self.notify(methods::NOTIFICATIONS_INITIALIZED, None).await?;

        *self.handshake.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(Handshake { protocol_version: negotiated, server_capabilities: initialize_result.capabilities });
        self.state.set(SessionState::Initialized);
        Ok(())
    }

    fn spawn_reader(this: Arc<Self>) {
        let reader_handle = Arc::clone(&this);
        let handle = tokio::spawn(async move {
            let this = reader_handle;
            loop {
                match this.transport.recv().await {
                    Ok(Some(raw)) => match classify(raw) {
                        Ok(envelope) => Arc::clone(&this).process_inbound(envelope).await,
                        Err(e) => warn!(error = %e, "dropped malformed inbound envelope"),
                    },
                    Ok(None) => {
                        debug!("transport closed cleanly, ending reader loop");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "transport read failed, ending reader loop");
                        break;
                    }
                }
            }
            this.state.set_alive(false);
            this.pending.fail_all(mcprt_transport::TransportError::ConnectionLost("reader loop ended".into()));
        });
        *this.reader.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Tear the session down. Idempotent.
    pub async fn stop(&self) -> Result<(), McprtError> {
        self.state.set(SessionState::Closing);
        if let Some(handle) = self.reader.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
        let _ = self.transport.close().await;
        self.state.set_alive(false);
        self.pending.fail_all(mcprt_transport::TransportError::ConnectionLost("session stopped".into()));
        self.elicitation_registry.release(&self.config.owner, "session stopped");
        self.human_in_the_loop_registry.release(&self.config.owner, "session stopped");
        self.sampling_registry.release(&self.config.owner, "session stopped");
        self.state.set(SessionState::Closed);
        Ok(())
    }

    /// `stop` then `start`.
    pub async fn restart(self: Arc<Self>) -> Result<(), McprtError> {
        self.stop().await?;
        self.state.set(SessionState::Uninitialized);
        self.start().await
    }

    /// Send `ping` and await the reply, reusing the same request/timeout
    /// path as any other method.
    pub async fn ping(&self) -> Result<(), McprtError> {
        self.request(methods::PING, None, None).await.map(|_| ())
    }

    fn allocate_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Send a request and await its matching response, bounded by `timeout`
    /// (or [`CoordinatorConfig::request_timeout`] if not given).
    pub async fn request(&self, method: &str, params: Option<Value>, timeout: Option<Duration>) -> Result<Value, McprtError> {
        if !self.state.alive() {
            return Err(McprtError::Transport { message: "session is not alive".into(), status: None });
        }
        let id = self.allocate_id();
        let envelope = Envelope::request(id.clone(), method, params);
        let receiver = self.pending.register(id.clone());

        self.transport
            .send(encode(&envelope))
            .await
            .map_err(|e| McprtError::Transport { message: e.to_string(), status: None })?;

        let deadline = timeout.unwrap_or(self.config.request_timeout);
        let outcome = match tokio::time::timeout(deadline, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => return Err(McprtError::Transport { message: "response channel dropped".into(), status: None }),
            Err(_) => {
                self.pending.cancel(&id, true);
                self.emit_cancelled(&id, "timeout".into()).await;
                return Err(McprtError::Timeout { request_id: id.to_string() });
            }
        };

        match outcome {
            Ok(Envelope::Success { result, .. }) => Ok(result),
            Ok(Envelope::Error { code, message, .. }) => {
                Err(McprtError::Handler(format!("server error {code}: {message}")))
            }
            Ok(_) => Err(McprtError::InvalidRequest("pending table delivered a non-response envelope".into())),
            Err(transport_err) => Err(McprtError::Transport { message: transport_err.to_string(), status: None }),
        }
    }

    /// Send a notification; no reply is expected.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McprtError> {
        let envelope = Envelope::notification(method, params);
        self.transport.send(encode(&envelope)).await.map_err(|e| McprtError::Transport { message: e.to_string(), status: None })
    }

    /// Feed one classified inbound envelope through dispatch (spec §4.6).
    pub async fn process_inbound(self: Arc<Self>, envelope: Envelope) {
        match envelope {
            Envelope::Success { ref id, .. } | Envelope::Error { id: Some(ref id), .. } => {
                let id = id.clone();
                if !self.pending.deliver(&id, envelope) {
                    debug!(%id, "response for unknown or already-settled request, dropped");
                }
            }
            Envelope::Error { id: None, code, message, .. } => {
                warn!(code, %message, "error response with no id, dropped");
            }
            Envelope::Notification { ref method, ref params } => {
                self.dispatch_notification(method, params.clone()).await;
            }
            Envelope::Request { id, ref method, ref params } => {
                self.dispatch_request(id, method, params.clone()).await;
            }
        }
    }

    async fn dispatch_notification(&self, method: &str, params: Option<Value>) {
        match method {
            methods::NOTIFICATIONS_PROGRESS => self.handlers.notify_progress(params.unwrap_or(Value::Null)),
            methods::NOTIFICATIONS_MESSAGE => self.handlers.notify_logging(params.unwrap_or(Value::Null)),
            methods::NOTIFICATIONS_RESOURCES_UPDATED => {
                self.handlers.notify_resource_update(params.unwrap_or(Value::Null));
            }
            methods::NOTIFICATIONS_CANCELLED => {
                if let Some(id) = params.as_ref().and_then(|p| p.get("requestId")).and_then(value_to_request_id) {
                    self.pending.cancel(&id, false);
                }
            }
            other => debug!(method = %other, "unhandled notification"),
        }
    }

    async fn dispatch_request(self: Arc<Self>, id: RequestId, method: &str, params: Option<Value>) {
        match method {
            methods::SAMPLING_CREATE_MESSAGE => self.dispatch_sampling(id, params).await,
            methods::ELICITATION_CREATE => self.dispatch_elicitation(id, params).await,
            other => {
                let _ = self.send_error(id, codes::METHOD_NOT_FOUND, format!("method not found: {other}")).await;
            }
        }
    }

    async fn send_success(&self, id: RequestId, result: Value) -> Result<(), McprtError> {
        let envelope = Envelope::success(id, result);
        self.transport.send(encode(&envelope)).await.map_err(|e| McprtError::Transport { message: e.to_string(), status: None })
    }

    async fn send_error(&self, id: RequestId, code: i64, message: String) -> Result<(), McprtError> {
        let envelope = Envelope::error(Some(id), code, message, None);
        self.transport.send(encode(&envelope)).await.map_err(|e| McprtError::Transport { message: e.to_string(), status: None })
    }

    async fn dispatch_sampling(self: Arc<Self>, id: RequestId, params: Option<Value>) {
        let Some(handler) = self.handlers.sampling() else {
            let _ = self.send_error(id, codes::METHOD_NOT_FOUND, "no sampling handler registered".into()).await;
            return;
        };
        let request: CreateMessageRequest = match params.and_then(|p| serde_json::from_value(p).ok()) {
            Some(r) => r,
            None => {
                let _ = self.send_error(id, codes::INVALID_PARAMS, "invalid sampling/createMessage params".into()).await;
                return;
            }
        };

        debug!(%id, "dispatching sampling/createMessage");
        self.handlers.run_sampling_before(&request);
        if let Err(e) = self.handlers.check_sampling(&request) {
            let (code, message) = e.as_jsonrpc();
            let outcome = HandlerResult::Reject(message.clone());
            self.handlers.run_sampling_after(&outcome);
            let _ = self.send_error(id, code, message).await;
            return;
        }

        let outcome = handler.handle(request).await;
        self.handlers.run_sampling_after(&outcome);
        match outcome {
            HandlerResult::Accept(result) => {
                let _ = self.send_success(id, serde_json::to_value(result).unwrap_or(Value::Null)).await;
            }
            HandlerResult::Reject(reason) | HandlerResult::Cancel(reason) => {
                let _ = self.send_error(id, -1, reason).await;
            }
            HandlerResult::Defer(response) => {
                response.ensure_timeout(DEFAULT_DEFER_TIMEOUT);
                self.sampling_registry.park(self.config.owner.clone(), id.clone(), response.clone());
                self.await_deferred_sampling(id, response);
            }
        }
    }

    fn await_deferred_sampling(self: Arc<Self>, id: RequestId, response: crate::async_response::AsyncResponse<mcprt_types::CreateMessageResult>) {
        tokio::spawn(async move {
            let outcome = response.wait().await;
            self.sampling_registry.remove(&id);
            self.reply_from_outcome(id, outcome).await;
        });
    }

    async fn dispatch_elicitation(self: Arc<Self>, id: RequestId, params: Option<Value>) {
        let Some(handler) = self.handlers.elicitation() else {
            let _ = self.send_error(id, codes::METHOD_NOT_FOUND, "no elicitation handler registered".into()).await;
            return;
        };
        let Some(params) = params else {
            let _ = self.send_error(id, codes::INVALID_PARAMS, "invalid elicitation/create params".into()).await;
            return;
        };
        let message = params.get("message").and_then(Value::as_str).unwrap_or_default().to_string();
        let schema: RequestedSchema = match params.get("requestedSchema").cloned().map(serde_json::from_value) {
            Some(Ok(schema)) => schema,
            _ => {
                let _ = self.send_error(id, codes::INVALID_PARAMS, "missing or invalid requestedSchema".into()).await;
                return;
            }
        };

        debug!(%id, "dispatching elicitation/create");
        let elicitation_request = crate::handler::ElicitationRequest { message: message.clone(), schema: schema.clone() };
        self.handlers.run_elicitation_before(&elicitation_request);
        if let Err(e) = self.handlers.check_elicitation(&elicitation_request) {
            let (code, message) = e.as_jsonrpc();
            let outcome = HandlerResult::Reject(message.clone());
            self.handlers.run_elicitation_after(&outcome);
            let _ = self.send_error(id, code, message).await;
            return;
        }

        let outcome = handler.handle(message, schema.clone()).await;
        self.handlers.run_elicitation_after(&outcome);
        match outcome {
            HandlerResult::Accept(value) => self.reply_elicitation_accept(id, value, &schema).await,
            HandlerResult::Reject(reason) => {
                let _ = self.send_error(id, -1, reason).await;
            }
            HandlerResult::Cancel(reason) => {
                let _ = self
                    .send_success(id, serde_json::json!({ "action": "cancel", "content": Value::Null, "_reason": reason }))
                    .await;
            }
            HandlerResult::Defer(response) => {
                response.ensure_timeout(DEFAULT_DEFER_TIMEOUT);
                self.elicitation_registry.park(self.config.owner.clone(), id.clone(), response.clone());
                self.await_deferred_elicitation(id, response, schema);
            }
        }
    }

    async fn reply_elicitation_accept(&self, id: RequestId, value: Value, schema: &RequestedSchema) {
        if let Err(e) = validate_elicitation(&value, schema) {
            let (code, message) = e.as_jsonrpc();
            let _ = self.send_error(id, code, message).await;
            return;
        }
        let _ = self.send_success(id, serde_json::json!({ "action": "accept", "content": value })).await;
    }

    fn await_deferred_elicitation(
        self: Arc<Self>,
        id: RequestId,
        response: crate::async_response::AsyncResponse<Value>,
        schema: RequestedSchema,
    ) {
        tokio::spawn(async move {
            let outcome = response.wait().await;
            self.elicitation_registry.remove(&id);
            match outcome {
                crate::async_response::AsyncOutcome::Completed(value) => {
                    self.reply_elicitation_accept(id, value, &schema).await;
                }
                crate::async_response::AsyncOutcome::Rejected(reason) => {
                    let _ = self.send_error(id, -1, reason).await;
                }
                crate::async_response::AsyncOutcome::Cancelled(reason) => {
                    let _ = self
                        .send_success(id, serde_json::json!({ "action": "cancel", "content": Value::Null, "_reason": reason }))
                        .await;
                    self.emit_cancelled(&id, reason).await;
                }
                crate::async_response::AsyncOutcome::TimedOut => {
                    let _ = self.send_error(id, -32801, "elicitation timed out".into()).await;
                    self.emit_cancelled(&id, "timed out".into()).await;
                }
                crate::async_response::AsyncOutcome::Pending => unreachable!("wait only returns terminal outcomes"),
            }
        });
    }

    async fn reply_from_outcome(&self, id: RequestId, outcome: crate::async_response::AsyncOutcome<mcprt_types::CreateMessageResult>) {
        match outcome {
            crate::async_response::AsyncOutcome::Completed(result) => {
                let _ = self.send_success(id, serde_json::to_value(result).unwrap_or(Value::Null)).await;
            }
            crate::async_response::AsyncOutcome::Rejected(reason) | crate::async_response::AsyncOutcome::Cancelled(reason) => {
                let _ = self.send_error(id, -1, reason).await;
            }
            crate::async_response::AsyncOutcome::TimedOut => {
                let _ = self.send_error(id, -32801, "sampling request timed out".into()).await;
                self.emit_cancelled(&id, "timed out".into()).await;
            }
            crate::async_response::AsyncOutcome::Pending => unreachable!("wait only returns terminal outcomes"),
        }
    }

    async fn emit_cancelled(&self, id: &RequestId, reason: String) {
        let _ = self
            .notify(methods::NOTIFICATIONS_CANCELLED, Some(serde_json::json!({ "requestId": id, "reason": reason })))
            .await;
    }

    /// Run a human-in-the-loop confirmation gate ahead of a sensitive local
    /// operation. Not itself a wire method: raised by application code
    /// before doing something the user should approve.
    pub async fn guard_human_in_the_loop(&self, description: impl Into<String>) -> Result<(), crate::error::HandlerError> {
        let description = description.into();
        let Some(handler) = self.handlers.human_in_the_loop() else {
            return Ok(());
        };

        self.handlers.run_human_in_the_loop_before(&description);
        self.handlers.check_human_in_the_loop(&description)?;

        let result = handler.handle(description).await;
        if !matches!(result, crate::handler::HumanInTheLoopResult::Defer(_)) {
            self.handlers.run_human_in_the_loop_after(&result);
        }
        match result {
            crate::handler::HumanInTheLoopResult::Approve => Ok(()),
            crate::handler::HumanInTheLoopResult::Deny(reason) => Err(crate::error::HandlerError::Declined(reason)),
            crate::handler::HumanInTheLoopResult::Defer(timeout) => {
                let id = self.allocate_id();
                let response = self.human_in_the_loop_registry.store(self.config.owner.clone(), id.clone());
                response.arm_timeout(timeout);
                let outcome = response.wait().await;
                self.human_in_the_loop_registry.remove(&id);
                let result = match &outcome {
                    crate::async_response::AsyncOutcome::Completed(true) => {
                        crate::handler::HumanInTheLoopResult::Approve
                    }
                    crate::async_response::AsyncOutcome::Completed(false) => {
                        crate::handler::HumanInTheLoopResult::Deny("denied".into())
                    }
                    crate::async_response::AsyncOutcome::Rejected(reason) => {
                        crate::handler::HumanInTheLoopResult::Deny(reason.clone())
                    }
                    crate::async_response::AsyncOutcome::Cancelled(_) | crate::async_response::AsyncOutcome::TimedOut => {
                        crate::handler::HumanInTheLoopResult::Deny("not approved".into())
                    }
                    crate::async_response::AsyncOutcome::Pending => unreachable!("wait only returns terminal outcomes"),
                };
                self.handlers.run_human_in_the_loop_after(&result);
                match outcome {
                    crate::async_response::AsyncOutcome::Completed(true) => Ok(()),
                    crate::async_response::AsyncOutcome::Completed(false) => {
                        Err(crate::error::HandlerError::Declined("denied".into()))
                    }
                    crate::async_response::AsyncOutcome::Rejected(reason) => Err(crate::error::HandlerError::Declined(reason)),
                    crate::async_response::AsyncOutcome::Cancelled(reason) => Err(crate::error::HandlerError::Cancelled(reason)),
                    crate::async_response::AsyncOutcome::TimedOut => {
                        Err(crate::error::HandlerError::TimedOut { timeout_secs: timeout.as_secs() })
                    }
                    crate::async_response::AsyncOutcome::Pending => unreachable!("wait only returns terminal outcomes"),
                }
            }
        }
    }

    /// The elicitation registry, for application code resolving deferred
    /// elicitation requests out-of-band (e.g. from a UI callback).
    pub fn elicitation_registry(&self) -> &Arc<ElicitationRegistry> {
        &self.elicitation_registry
    }

    /// The human-in-the-loop registry, for application code resolving
    /// deferred confirmations out-of-band.
    pub fn human_in_the_loop_registry(&self) -> &Arc<HumanInTheLoopRegistry> {
        &self.human_in_the_loop_registry
    }
}

fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(s) = value.as_str() {
        return Some(RequestId::String(s.to_string()));
    }
    value.as_i64().map(RequestId::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mcprt_transport::{TransportKind, TransportResult};
    use tokio::sync::Mutex as TokioMutex;
    use tokio::sync::mpsc;

    struct FakeTransport {
        outbound: TokioMutex<mpsc::UnboundedSender<Value>>,
        outbound_rx: TokioMutex<Option<mpsc::UnboundedReceiver<Value>>>,
        inbound: TokioMutex<mpsc::UnboundedReceiver<Value>>,
    }

    impl std::fmt::Debug for FakeTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FakeTransport").finish_non_exhaustive()
        }
    }

    impl FakeTransport {
        fn new() -> (Arc<Self>, mpsc::UnboundedSender<Value>) {
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let (in_tx, in_rx) = mpsc::unbounded_channel();
            (
                Arc::new(Self {
                    outbound: TokioMutex::new(out_tx),
                    outbound_rx: TokioMutex::new(Some(out_rx)),
                    inbound: TokioMutex::new(in_rx),
                }),
                in_tx,
            )
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        fn kind(&self) -> TransportKind {
            TransportKind::Custom
        }

        async fn connect(&self) -> TransportResult<()> {
            Ok(())
        }

        async fn send(&self, message: Value) -> TransportResult<()> {
            let _ = self.outbound.lock().await.send(message);
            Ok(())
        }

        async fn recv(&self) -> TransportResult<Option<Value>> {
            Ok(self.inbound.lock().await.recv().await)
        }

        async fn close(&self) -> TransportResult<()> {
            Ok(())
        }

        fn is_alive(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn full_handshake_negotiates_default_version() {
        let (transport, server_tx) = FakeTransport::new();
        let coordinator = Arc::new(Coordinator::new(transport.clone(), CoordinatorConfig::default()));

        let responder = {
            let mut rx = transport.outbound_rx.lock().await.take().unwrap();
            let server_tx = server_tx.clone();
            tokio::spawn(async move {
                let initialize_call = rx.recv().await.unwrap();
                let id = initialize_call.get("id").cloned().unwrap();
                let response = serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "protocolVersion": version::DEFAULT_VERSION,
                        "capabilities": {},
                        "serverInfo": { "name": "test-server", "version": "0.0.1" },
                    }
                });
                server_tx.send(response).unwrap();
                let _initialized_notification = rx.recv().await.unwrap();
                rx
            })
        };

        Arc::clone(&coordinator).start().await.unwrap();
        let _rx = responder.await.unwrap();

        assert_eq!(coordinator.state(), SessionState::Initialized);
        let (negotiated_version, _) = coordinator.negotiated().unwrap();
        assert_eq!(negotiated_version, version::DEFAULT_VERSION);
    }

    #[tokio::test]
    async fn request_without_a_reply_times_out() {
        let (transport, _server_tx) = FakeTransport::new();
        let mut outbound = transport.outbound_rx.lock().await.take().unwrap();
        let coordinator = Coordinator::new(transport, CoordinatorConfig::default());
        coordinator.state.set_alive(true);
        let err = coordinator.request("tools/list", None, Some(Duration::from_millis(10))).await.unwrap_err();
        assert!(matches!(err, McprtError::Timeout { .. }));

        let _request = outbound.recv().await.unwrap();
        let cancelled = outbound.recv().await.unwrap();
        assert_eq!(cancelled["method"], "notifications/cancelled");
        assert_eq!(cancelled["params"]["reason"], "timeout");
    }

    #[derive(Debug)]
    struct DeclineSampling;

    #[async_trait]
    impl crate::handler::SamplingHandler for DeclineSampling {
        async fn handle(
            &self,
            _request: CreateMessageRequest,
        ) -> HandlerResult<mcprt_types::CreateMessageResult, crate::async_response::AsyncResponse<mcprt_types::CreateMessageResult>>
        {
            HandlerResult::Reject("sampling disabled in this test".to_string())
        }
    }

    #[tokio::test]
    async fn registered_sampling_handler_reject_uses_the_reserved_decline_code() {
        let (transport, _server_tx) = FakeTransport::new();
        let coordinator = Arc::new(Coordinator::new(transport.clone(), CoordinatorConfig::default()));
        coordinator.state.set_alive(true);
        coordinator.on_sampling(Arc::new(DeclineSampling));

        let mut rx = transport.outbound_rx.lock().await.take().unwrap();
        let call = Envelope::request(RequestId::Number(3), methods::SAMPLING_CREATE_MESSAGE, Some(serde_json::json!({"messages": []})));
        coordinator.process_inbound(classify(encode(&call)).unwrap()).await;

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply["error"]["code"], serde_json::json!(-1));
    }

    #[derive(Debug)]
    struct AcceptSampling;

    #[async_trait]
    impl crate::handler::SamplingHandler for AcceptSampling {
        async fn handle(
            &self,
            _request: CreateMessageRequest,
        ) -> HandlerResult<mcprt_types::CreateMessageResult, crate::async_response::AsyncResponse<mcprt_types::CreateMessageResult>>
        {
            HandlerResult::Accept(mcprt_types::CreateMessageResult {
                role: mcprt_types::Role::Assistant,
                content: mcprt_types::Content::Text(mcprt_types::TextContent { text: "hi".into(), annotations: None }),
                model: Some("test-model".to_string()),
                stop_reason: None,
            })
        }
    }

    #[tokio::test]
    async fn a_sampling_guard_rejection_short_circuits_the_handler_and_fires_hooks() {
        let (transport, _server_tx) = FakeTransport::new();
        let coordinator = Arc::new(Coordinator::new(transport.clone(), CoordinatorConfig::default()));
        coordinator.state.set_alive(true);
        coordinator.on_sampling(Arc::new(AcceptSampling));
        coordinator.add_sampling_guard(Arc::new(|_: &CreateMessageRequest| Err("sampling disabled by guard".to_string())));

        let before_ran = Arc::new(Mutex::new(false));
        let after_reason = Arc::new(Mutex::new(None));
        let before_flag = Arc::clone(&before_ran);
        coordinator.on_sampling_before(Arc::new(move |_| *before_flag.lock().unwrap_or_else(|e| e.into_inner()) = true));
        let after_flag = Arc::clone(&after_reason);
        coordinator.on_sampling_after(Arc::new(move |outcome| {
            if let HandlerResult::Reject(reason) = outcome {
                *after_flag.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason.clone());
            }
        }));

        let mut rx = transport.outbound_rx.lock().await.take().unwrap();
        let call = Envelope::request(RequestId::Number(7), methods::SAMPLING_CREATE_MESSAGE, Some(serde_json::json!({"messages": []})));
        coordinator.process_inbound(classify(encode(&call)).unwrap()).await;

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply["error"]["code"], serde_json::json!(-1));
        assert!(*before_ran.lock().unwrap());
        assert_eq!(after_reason.lock().unwrap().as_deref(), Some("sampling disabled by guard"));
    }

    #[tokio::test]
    async fn unsolicited_sampling_request_without_a_handler_is_method_not_found() {
        let (transport, _server_tx) = FakeTransport::new();
        let coordinator = Arc::new(Coordinator::new(transport.clone(), CoordinatorConfig::default()));
        coordinator.state.set_alive(true);

        let mut rx = transport.outbound_rx.lock().await.take().unwrap();
        let call = Envelope::request(RequestId::Number(9), methods::SAMPLING_CREATE_MESSAGE, Some(serde_json::json!({"messages": []})));
        coordinator.process_inbound(classify(encode(&call)).unwrap()).await;

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply["error"]["code"], serde_json::json!(codes::METHOD_NOT_FOUND));
    }
}
