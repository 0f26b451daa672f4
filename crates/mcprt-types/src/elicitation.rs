//! `elicitation/create` payload types (server→client request, §6).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The outcome the user chose in response to an elicitation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElicitationAction {
    /// The user supplied the requested data.
    Accept,
    /// The user explicitly declined.
    Decline,
    /// The user dismissed the prompt without answering.
    Cancel,
}

/// A flattened JSON-Schema-like description of one requested field.
///
/// MCP restricts elicitation schemas to primitive types so that generic
/// clients can always render a form without a full JSON Schema validator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PrimitiveSchemaDefinition {
    /// A string field.
    String {
        /// Optional human-readable label.
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Optional maximum length.
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<u32>,
    },
    /// A numeric field.
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        /// Optional human-readable label.
        title: Option<String>,
    },
    /// An integer field.
    Integer {
        #[serde(skip_serializing_if = "Option::is_none")]
        /// Optional human-readable label.
        title: Option<String>,
    },
    /// A boolean field.
    Boolean {
        #[serde(skip_serializing_if = "Option::is_none")]
        /// Optional human-readable label.
        title: Option<String>,
        /// Default value if the field is left unanswered.
        #[serde(skip_serializing_if = "Option::is_none")]
        default: Option<bool>,
    },
}

/// The server-sent schema describing what fields `elicitation/create` wants back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RequestedSchema {
    /// Schema type, always `"object"` per the MCP spec.
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,
    /// Field definitions keyed by field name.
    pub properties: HashMap<String, PrimitiveSchemaDefinition>,
    /// Which fields must be present in the accepted response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

fn object_type() -> String {
    "object".to_string()
}
