//! MCP method and notification names (spec §6), as `&'static str` constants.
//!
//! Kept as plain strings rather than an enum: method dispatch happens against
//! wire text, and a server is free to send a method this runtime does not
//! recognize (it becomes `MethodNotFound`, not a parse failure).

/// Client→server handshake request. Must be the first request on a new
/// session.
pub const INITIALIZE: &str = "initialize";
/// Client→server notification confirming the handshake is complete.
pub const NOTIFICATIONS_INITIALIZED: &str = "notifications/initialized";
/// Bidirectional liveness check.
pub const PING: &str = "ping";

/// List available tools.
pub const TOOLS_LIST: &str = "tools/list";
/// Invoke a tool.
pub const TOOLS_CALL: &str = "tools/call";
/// Server→client notification that the tool list changed.
pub const NOTIFICATIONS_TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";

/// List available resources.
pub const RESOURCES_LIST: &str = "resources/list";
/// List available resource templates.
pub const RESOURCES_TEMPLATES_LIST: &str = "resources/templates/list";
/// Read a resource's contents.
pub const RESOURCES_READ: &str = "resources/read";
/// Subscribe to change notifications for a resource.
pub const RESOURCES_SUBSCRIBE: &str = "resources/subscribe";
/// Cancel a prior subscription.
pub const RESOURCES_UNSUBSCRIBE: &str = "resources/unsubscribe";
/// Server→client notification that a subscribed resource changed.
pub const NOTIFICATIONS_RESOURCES_UPDATED: &str = "notifications/resources/updated";
/// Server→client notification that the resource list changed.
pub const NOTIFICATIONS_RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";

/// List available prompts.
pub const PROMPTS_LIST: &str = "prompts/list";
/// Fetch a rendered prompt.
pub const PROMPTS_GET: &str = "prompts/get";
/// Server→client notification that the prompt list changed.
pub const NOTIFICATIONS_PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";

/// Request argument-completion suggestions.
pub const COMPLETION_COMPLETE: &str = "completion/complete";

/// Client→server request to change the minimum log level the server emits.
pub const LOGGING_SET_LEVEL: &str = "logging/setLevel";
/// Server→client log message notification.
pub const NOTIFICATIONS_MESSAGE: &str = "notifications/message";

/// Server→client request for an LLM completion (the client owns the model).
pub const SAMPLING_CREATE_MESSAGE: &str = "sampling/createMessage";
/// Server→client request to collect structured input from the human.
pub const ELICITATION_CREATE: &str = "elicitation/create";
/// Server→client request for the filesystem roots the client exposes.
pub const ROOTS_LIST: &str = "roots/list";
/// Server→client notification that the client's roots changed.
pub const NOTIFICATIONS_ROOTS_LIST_CHANGED: &str = "notifications/roots/list_changed";

/// Bidirectional progress notification for a long-running request.
pub const NOTIFICATIONS_PROGRESS: &str = "notifications/progress";
/// Bidirectional notification that a pending request was cancelled.
pub const NOTIFICATIONS_CANCELLED: &str = "notifications/cancelled";

/// Methods a server may send unsolicited (no corresponding client request).
pub const SERVER_INITIATED_METHODS: &[&str] =
    &[SAMPLING_CREATE_MESSAGE, ELICITATION_CREATE, ROOTS_LIST, PING];
