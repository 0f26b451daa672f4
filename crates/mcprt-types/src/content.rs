//! Content blocks shared by tool results, prompt messages, and sampling.

use serde::{Deserialize, Serialize};

/// Role in a conversation or prompt message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human or the calling client.
    #[default]
    User,
    /// The model or the server acting on its behalf.
    Assistant,
}

/// A content block as used in `CallToolResult.content` and
/// `PromptMessage.content`.
///
/// Union per the MCP spec: text, image, audio, a link to a resource, or an
/// embedded resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Content {
    /// Plain text.
    #[serde(rename = "text")]
    Text(TextContent),
    /// Base64-encoded image.
    #[serde(rename = "image")]
    Image(ImageContent),
    /// Base64-encoded audio.
    #[serde(rename = "audio")]
    Audio(AudioContent),
    /// Reference to a resource without embedding its contents.
    #[serde(rename = "resource_link")]
    ResourceLink(ResourceLink),
    /// A resource embedded inline.
    #[serde(rename = "resource")]
    Resource(EmbeddedResource),
}

impl Content {
    /// Build a text content block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextContent {
            text: text.into(),
            annotations: None,
        })
    }

    /// Build an image content block from base64 data.
    #[must_use]
    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Image(ImageContent {
            data: data.into(),
            mime_type: mime_type.into(),
            annotations: None,
        })
    }

    /// Returns the text of this block if it is a [`Content::Text`] variant.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(&t.text),
            _ => None,
        }
    }
}

/// Text content block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TextContent {
    /// The text itself.
    pub text: String,
    /// Optional client-facing display hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<serde_json::Value>,
}

/// Image content block, base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageContent {
    /// Base64-encoded image bytes.
    pub data: String,
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional client-facing display hints.
    pub annotations: Option<serde_json::Value>,
}

/// Audio content block, base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioContent {
    /// Base64-encoded audio bytes.
    pub data: String,
    /// MIME type, e.g. `audio/wav`.
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional client-facing display hints.
    pub annotations: Option<serde_json::Value>,
}

/// Reference to a resource without inlining its contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceLink {
    /// The resource's URI.
    pub uri: String,
    /// Human-readable name.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional description.
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional MIME type.
    pub mime_type: Option<String>,
}

/// A resource embedded directly in a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedResource {
    /// The embedded resource's contents.
    pub resource: super::resources::ResourceContents,
}
