//! Domain payload types exchanged once an MCP session is live.
//!
//! These are the typed views over `tools/*`, `resources/*`, `prompts/*`,
//! `completion/*`, `sampling/*` and `elicitation/*` payloads. The envelope
//! that carries them (JSON-RPC request/response/notification) lives in
//! `mcprt-core`; this crate only knows about the MCP-specific shapes nested
//! inside `params`/`result`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod capabilities;
mod content;
mod elicitation;
mod initialization;
mod logging;
mod prompts;
mod resources;
mod sampling;
mod tools;

pub use capabilities::{ClientCapabilities, ServerCapabilities};
pub use content::{AudioContent, Content, EmbeddedResource, ImageContent, ResourceLink, Role, TextContent};
pub use elicitation::{ElicitationAction, PrimitiveSchemaDefinition, RequestedSchema};
pub use initialization::{ClientInfo, InitializeResult, ServerInfo};
pub use logging::LogLevel;
pub use prompts::{Prompt, PromptArgument, PromptMessage};
pub use resources::{Resource, ResourceContents, ResourceTemplate};
pub use sampling::{CreateMessageRequest, CreateMessageResult, SamplingMessage};
pub use tools::Tool;
