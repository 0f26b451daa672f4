//! `initialize` request/response payloads.

use serde::{Deserialize, Serialize};

use crate::capabilities::ServerCapabilities;

/// Identifies the calling client application in `initialize`'s `clientInfo`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientInfo {
    /// Application name.
    pub name: String,
    /// Application version string.
    pub version: String,
}

/// Identifies the server in the `InitializeResult`'s `serverInfo`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version string.
    pub version: String,
}

/// The `result` payload of a successful `initialize` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeResult {
    /// The protocol version the server agreed to use.
    pub protocol_version: String,
    /// The server's declared capabilities.
    pub capabilities: ServerCapabilities,
    /// Identifying information about the server.
    pub server_info: ServerInfo,
    /// Optional human-readable instructions for the calling LLM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}
