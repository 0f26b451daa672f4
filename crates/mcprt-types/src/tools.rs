//! `tools/list` and `tools/call` payload types.

use serde::{Deserialize, Serialize};

/// A tool the server advertises via `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// Unique tool name, used as the `name` argument to `tools/call`.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema describing the `arguments` object `tools/call` expects.
    pub input_schema: serde_json::Value,
    /// Optional JSON Schema describing `tools/call`'s structured result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
}
