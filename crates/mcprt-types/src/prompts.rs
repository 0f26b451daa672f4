//! `prompts/list` and `prompts/get` payload types.

use serde::{Deserialize, Serialize};

use crate::content::{Content, Role};

/// A prompt template the server advertises via `prompts/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    /// Unique prompt name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arguments the prompt template accepts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgument>,
}

/// One named argument a prompt template accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the argument must be supplied to `prompts/get`.
    #[serde(default)]
    pub required: bool,
}

/// One message in a `prompts/get` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptMessage {
    /// Who the message is attributed to.
    pub role: Role,
    /// The message content.
    pub content: Content,
}
