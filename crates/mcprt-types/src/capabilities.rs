//! Capability negotiation payloads exchanged during `initialize`.

use serde::{Deserialize, Serialize};

/// Capabilities the client advertises to the server during `initialize`.
///
/// Each field is `Some` only when the corresponding feature is actually
/// usable — the coordinator sets `sampling` iff a sampling handler is
/// registered, `elicitation` iff an elicitation handler is registered, and so
/// on, per spec §4.6 step 2.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientCapabilities {
    /// The client can service `sampling/createMessage` requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<serde_json::Map<String, serde_json::Value>>,
    /// The client can service `roots/list` requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<RootsCapability>,
    /// The client can service `elicitation/create` requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elicitation: Option<serde_json::Map<String, serde_json::Value>>,
    /// The client accepts `notifications/progress`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Sub-capability describing whether the client's roots list may change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootsCapability {
    /// The client will emit `notifications/roots/list_changed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Capabilities the server declares in its `InitializeResult`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerCapabilities {
    /// `tools/list` and `tools/call` are available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Map<String, serde_json::Value>>,
    /// `resources/*` are available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<serde_json::Map<String, serde_json::Value>>,
    /// `prompts/*` are available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<serde_json::Map<String, serde_json::Value>>,
    /// `completion/complete` is available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completions: Option<serde_json::Map<String, serde_json::Value>>,
    /// `logging/setLevel` and `notifications/message` are available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<serde_json::Map<String, serde_json::Value>>,
    /// Experimental / server-specific capability flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ServerCapabilities {
    /// Whether the server declared tool support.
    #[must_use]
    pub fn supports_tools(&self) -> bool {
        self.tools.is_some()
    }

    /// Whether the server declared resource support.
    #[must_use]
    pub fn supports_resources(&self) -> bool {
        self.resources.is_some()
    }

    /// Whether the server declared prompt support.
    #[must_use]
    pub fn supports_prompts(&self) -> bool {
        self.prompts.is_some()
    }
}
