//! The handler runtime: guard chains, lifecycle hooks, declared options, and
//! the discriminated `HandlerResult` unions each server-initiated request
//! kind produces (spec §3, §4.7).
//!
//! Grounded on the teacher's `handlers.rs` handler-trait family (async,
//! `Send + Sync + Debug`, one trait per request kind) but reshaped around
//! the `Accept`/`Reject`/`Cancel`/`Defer` union the specification describes
//! rather than the teacher's plain `Result<T, HandlerError>`.

mod guard;
mod options;
mod registry;
mod result;

pub use guard::{Guard, GuardChain};
pub use options::{MissingRequired, Options};
pub use registry::HandlerSlots;
pub use result::{HandlerResult, HumanInTheLoopResult};

/// The full input to an elicitation handler, bundled so a [`Guard`] or
/// [`BeforeHook`] can inspect the prompt and its schema together instead of
/// only the message text.
#[derive(Debug, Clone)]
pub struct ElicitationRequest {
    /// The message shown to the user.
    pub message: String,
    /// The schema the accepted response must validate against.
    pub schema: RequestedSchema,
}

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcprt_types::{CreateMessageRequest, CreateMessageResult, RequestedSchema};
use serde_json::Value;

use crate::async_response::AsyncResponse;
use crate::error::HandlerError;

/// Runs before a handler's guards and `execute`. Observes only — a before
/// hook cannot itself reject the request, that is the guard chain's job.
pub type BeforeHook<Req> = Arc<dyn Fn(&Req) + Send + Sync>;
/// Runs after `execute` produces its outcome. Observes only.
pub type AfterHook<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handles `sampling/createMessage` (spec §6).
#[async_trait]
pub trait SamplingHandler: Send + Sync + Debug {
    /// Decide how to answer a server-initiated sampling request. A
    /// `Defer`red response settles through the same [`AsyncResponse`]
    /// terminal states (`complete`/`reject`/`cancel`/timeout) that the
    /// coordinator's registries use.
    async fn handle(&self, request: CreateMessageRequest) -> HandlerResult<CreateMessageResult, AsyncResponse<CreateMessageResult>>;
}

/// Handles `elicitation/create` (spec §6). Accepted values must validate
/// against `schema` before the coordinator ever writes them to the wire.
#[async_trait]
pub trait ElicitationHandler: Send + Sync + Debug {
    /// Decide how to answer a server-initiated elicitation request.
    async fn handle(&self, message: String, schema: RequestedSchema) -> HandlerResult<Value, AsyncResponse<Value>>;
}

/// Handles a human-in-the-loop confirmation gate that is not itself a wire
/// method — raised internally before a sensitive tool call, per spec §3's
/// `HumanInTheLoopResult` (`Approve`/`Deny`/`Defer`).
#[async_trait]
pub trait HumanInTheLoopHandler: Send + Sync + Debug {
    /// Decide whether to approve, deny, or defer one confirmation request.
    async fn handle(&self, description: String) -> HumanInTheLoopResult;
}

/// Validates an accepted elicitation object against the server's declared
/// schema (spec §3, `RequestedSchema`). Only the primitive shapes MCP
/// allows are checked: presence of `required` fields and, where declared,
/// the field's primitive type.
pub fn validate_elicitation(value: &Value, schema: &RequestedSchema) -> Result<(), HandlerError> {
    let object = value.as_object().ok_or_else(|| HandlerError::InvalidInput("elicitation response must be an object".into()))?;

    for field in &schema.required {
        if !object.contains_key(field) {
            return Err(HandlerError::InvalidInput(format!("missing required field: {field}")));
        }
    }

    for (name, definition) in &schema.properties {
        let Some(value) = object.get(name) else { continue };
        let type_ok = match definition {
            mcprt_types::PrimitiveSchemaDefinition::String { .. } => value.is_string(),
            mcprt_types::PrimitiveSchemaDefinition::Number { .. } => value.is_number(),
            mcprt_types::PrimitiveSchemaDefinition::Integer { .. } => value.is_i64() || value.is_u64(),
            mcprt_types::PrimitiveSchemaDefinition::Boolean { .. } => value.is_boolean(),
        };
        if !type_ok {
            return Err(HandlerError::InvalidInput(format!("field {name} does not match its declared type")));
        }
    }

    Ok(())
}

/// How long a deferred handler is allowed to run before the coordinator
/// times it out and emits `notifications/cancelled` (spec §4.7).
pub const DEFAULT_DEFER_TIMEOUT: Duration = Duration::from_secs(300);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn schema_with_required(field: &str) -> RequestedSchema {
        RequestedSchema {
            schema_type: "object".into(),
            properties: HashMap::new(),
            required: vec![field.to_string()],
        }
    }

    #[test]
    fn missing_required_field_is_invalid() {
        let schema = schema_with_required("name");
        let value = serde_json::json!({});
        assert!(validate_elicitation(&value, &schema).is_err());
    }

    #[test]
    fn present_required_field_passes() {
        let schema = schema_with_required("name");
        let value = serde_json::json!({ "name": "ok" });
        assert!(validate_elicitation(&value, &schema).is_ok());
    }

    #[test]
    fn non_object_value_is_invalid() {
        let schema = RequestedSchema::default();
        let value = serde_json::json!("not an object");
        assert!(validate_elicitation(&value, &schema).is_err());
    }
}
