//! `sampling/createMessage` payload types (server→client request, §6).

use serde::{Deserialize, Serialize};

use crate::content::{Content, Role};

/// One message in a sampling conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplingMessage {
    /// Who the message is attributed to.
    pub role: Role,
    /// The message content.
    pub content: Content,
}

/// The `params` of a server-initiated `sampling/createMessage` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateMessageRequest {
    /// Conversation history the server wants completed.
    pub messages: Vec<SamplingMessage>,
    /// Maximum tokens the client's LLM call should generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Optional system prompt override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Opaque model-selection hints the server would like honored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_preferences: Option<serde_json::Value>,
}

/// The `result` a sampling handler produces on `HandlerResult::Accept`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateMessageResult {
    /// The completion, attributed to the assistant role.
    pub role: Role,
    /// The generated content.
    pub content: Content,
    /// Name of the model that produced the completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Why generation stopped (`"endTurn"`, `"maxTokens"`, `"stopSequence"`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}
