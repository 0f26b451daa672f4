//! JSON-RPC 2.0 envelope types and the encode/decode/classify/validate codec (spec §4.1).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{codes, McprtError};

/// A JSON-RPC request id: either a string or an integer, never both, never absent
/// on a request. `Null` only appears on error responses whose originating request
/// could not be identified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id, as most MCP implementations emit.
    Number(i64),
    /// String id.
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

/// A classified, already-valid JSON-RPC 2.0 envelope.
///
/// `classify` produces this from an arbitrary [`serde_json::Value`]; once you
/// hold an `Envelope` the four JSON-RPC invariants (§8, I-JR1..I-JR4) are
/// known to hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// A call expecting a response.
    Request {
        /// Correlation id.
        id: RequestId,
        /// Method name.
        method: String,
        /// Method parameters, if any.
        params: Option<Value>,
    },
    /// A call with no response expected.
    Notification {
        /// Method name.
        method: String,
        /// Method parameters, if any.
        params: Option<Value>,
    },
    /// A successful reply to a prior request.
    Success {
        /// Id echoed back from the request.
        id: RequestId,
        /// The result payload.
        result: Value,
    },
    /// A failed reply to a prior request.
    Error {
        /// Id echoed back from the request, or `None` if it could not be
        /// determined (e.g. the request itself failed to parse).
        id: Option<RequestId>,
        /// JSON-RPC error code.
        code: i64,
        /// Human-readable message.
        message: String,
        /// Optional structured error data.
        data: Option<Value>,
    },
}

impl Envelope {
    /// Build a request envelope.
    pub fn request(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Envelope::Request { id, method: method.into(), params }
    }

    /// Build a notification envelope.
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Envelope::Notification { method: method.into(), params }
    }

    /// Build a success response envelope.
    pub fn success(id: RequestId, result: Value) -> Self {
        Envelope::Success { id, result }
    }

    /// Build an error response envelope.
    pub fn error(id: Option<RequestId>, code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Envelope::Error { id, code, message: message.into(), data }
    }

    /// Convenience constructor for the standard `-32601` reply.
    pub fn method_not_found(id: Option<RequestId>, method: &str) -> Self {
        Envelope::error(id, codes::METHOD_NOT_FOUND, format!("method not found: {method}"), None)
    }

    /// The request/notification method name, if this envelope carries one.
    pub fn method(&self) -> Option<&str> {
        match self {
            Envelope::Request { method, .. } | Envelope::Notification { method, .. } => Some(method),
            _ => None,
        }
    }

    /// The correlation id, for variants that carry one.
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Envelope::Request { id, .. } | Envelope::Success { id, .. } => Some(id),
            Envelope::Error { id, .. } => id.as_ref(),
            Envelope::Notification { .. } => None,
        }
    }

    /// `true` for `Request`/`Notification` (client→server direction is not
    /// implied; either peer may send either kind).
    pub fn is_outbound_call(&self) -> bool {
        matches!(self, Envelope::Request { .. } | Envelope::Notification { .. })
    }
}

/// Encode an envelope to its wire JSON form, tagging `jsonrpc: "2.0"`.
pub fn encode(envelope: &Envelope) -> Value {
    match envelope {
        Envelope::Request { id, method, params } => {
            let mut obj = serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
            });
            if let Some(params) = params {
                obj["params"] = params.clone();
            }
            obj
        }
        Envelope::Notification { method, params } => {
            let mut obj = serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
            });
            if let Some(params) = params {
                obj["params"] = params.clone();
            }
            obj
        }
        Envelope::Success { id, result } => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result,
        }),
        Envelope::Error { id, code, message, data } => {
            let mut error = serde_json::json!({ "code": code, "message": message });
            if let Some(data) = data {
                error["data"] = data.clone();
            }
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": error,
            })
        }
    }
}

/// Serialize an envelope directly to a newline-free JSON string, as stdio
/// transports write one message per line.
pub fn encode_to_string(envelope: &Envelope) -> Result<String, McprtError> {
    serde_json::to_string(&encode(envelope)).map_err(|e| McprtError::Parse(e.to_string()))
}

/// Parse raw bytes into a [`Value`], translating a syntax failure into the
/// `-32700 Parse error` taxonomy member. Does not yet check envelope shape;
/// call [`classify`] next.
pub fn decode(bytes: &[u8]) -> Result<Value, McprtError> {
    serde_json::from_slice(bytes).map_err(|e| McprtError::Parse(e.to_string()))
}

/// Validate and classify a raw JSON value into an [`Envelope`].
///
/// Enforces, in order (I-JR1..I-JR4 in spec §8):
/// 1. `jsonrpc` is present and exactly `"2.0"`.
/// 2. The value is a JSON object (not an array — batching is out of scope,
///    Non-goal).
/// 3. Exactly one of `method` (request/notification) or `result`/`error`
///    (response) is present, never both, never neither.
/// 4. A `method` entry with no `id` is a notification; a `method` entry
///    with an `id` is a request. A `result`/`error` entry always carries
///    `id` (nullable only for a malformed-request error reply).
pub fn classify(value: Value) -> Result<Envelope, McprtError> {
    let obj = value
        .as_object()
        .ok_or_else(|| McprtError::InvalidRequest("envelope must be a JSON object".into()))?;

    match obj.get("jsonrpc").and_then(Value::as_str) {
        Some("2.0") => {}
        Some(other) => {
            return Err(McprtError::InvalidRequest(format!("unsupported jsonrpc version: {other}")))
        }
        None => return Err(McprtError::InvalidRequest("missing jsonrpc field".into())),
    }

    let has_method = obj.contains_key("method");
    let has_result = obj.contains_key("result");
    let has_error = obj.contains_key("error");

    if has_result && has_error {
        return Err(McprtError::InvalidRequest("response carries both result and error".into()));
    }

    if has_method {
        if has_result || has_error {
            return Err(McprtError::InvalidRequest("envelope mixes a call and a response".into()));
        }
        let method = obj
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| McprtError::InvalidRequest("method must be a string".into()))?
            .to_string();
        let params = obj.get("params").cloned();
        if let Some(params) = &params {
            if !params.is_object() && !params.is_array() {
                return Err(McprtError::InvalidRequest("params must be an object or array".into()));
            }
        }

        return match obj.get("id") {
            None => Ok(Envelope::Notification { method, params }),
            Some(raw_id) => {
                let id = parse_request_id(raw_id)?;
                Ok(Envelope::Request { id, method, params })
            }
        };
    }

    if has_result {
        let id = parse_request_id(
            obj.get("id").ok_or_else(|| McprtError::InvalidRequest("response missing id".into()))?,
        )?;
        return Ok(Envelope::Success { id, result: obj.get("result").cloned().unwrap_or(Value::Null) });
    }

    if has_error {
        let id = match obj.get("id") {
            Some(Value::Null) | None => None,
            Some(raw_id) => Some(parse_request_id(raw_id)?),
        };
        let error_obj = obj
            .get("error")
            .and_then(Value::as_object)
            .ok_or_else(|| McprtError::InvalidRequest("error field must be an object".into()))?;
        let code = error_obj
            .get("code")
            .and_then(Value::as_i64)
            .ok_or_else(|| McprtError::InvalidRequest("error.code must be an integer".into()))?;
        let message = error_obj
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| McprtError::InvalidRequest("error.message must be a string".into()))?
            .to_string();
        let data = error_obj.get("data").cloned();
        return Ok(Envelope::Error { id, code, message, data });
    }

    Err(McprtError::InvalidRequest("envelope is neither a call nor a response".into()))
}

fn parse_request_id(raw: &Value) -> Result<RequestId, McprtError> {
    match raw {
        Value::String(s) => Ok(RequestId::String(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(RequestId::Number)
            .ok_or_else(|| McprtError::InvalidRequest("id must be an integer or string".into())),
        other => Err(McprtError::InvalidRequest(format!("invalid id type: {other}"))),
    }
}

/// Validate a raw value without materializing an [`Envelope`]. Used by
/// transports that want to reject garbage before allocating.
pub fn validate(value: &Value) -> Result<(), McprtError> {
    classify(value.clone()).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_round_trips_through_encode_and_classify() {
        let envelope = Envelope::request(RequestId::Number(7), "tools/list", None);
        let wire = encode(&envelope);
        let classified = classify(wire).unwrap();
        assert_eq!(classified, envelope);
    }

    #[test]
    fn notification_has_no_id() {
        let envelope = Envelope::notification("notifications/initialized", None);
        let wire = encode(&envelope);
        assert!(wire.get("id").is_none());
    }

    #[test]
    fn missing_jsonrpc_field_is_invalid_request() {
        let value = serde_json::json!({ "id": 1, "method": "ping" });
        assert!(matches!(classify(value), Err(McprtError::InvalidRequest(_))));
    }

    #[test]
    fn wrong_jsonrpc_version_is_invalid_request() {
        let value = serde_json::json!({ "jsonrpc": "1.0", "id": 1, "method": "ping" });
        assert!(matches!(classify(value), Err(McprtError::InvalidRequest(_))));
    }

    #[test]
    fn array_payload_is_rejected() {
        let value = serde_json::json!([{ "jsonrpc": "2.0", "id": 1, "method": "ping" }]);
        assert!(classify(value).is_err());
    }

    #[test]
    fn response_with_both_result_and_error_is_invalid() {
        let value = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {},
            "error": { "code": -32603, "message": "x" },
        });
        assert!(classify(value).is_err());
    }

    #[test]
    fn error_response_may_carry_null_id() {
        let value = serde_json::json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": { "code": -32700, "message": "parse error" },
        });
        let envelope = classify(value).unwrap();
        assert!(matches!(envelope, Envelope::Error { id: None, code: -32700, .. }));
    }

    #[test]
    fn decode_rejects_truncated_json() {
        assert!(decode(b"{\"jsonrpc\":").is_err());
    }

    #[test]
    fn scalar_params_are_rejected() {
        let value = serde_json::json!({ "jsonrpc": "2.0", "id": 1, "method": "ping", "params": "oops" });
        assert!(matches!(classify(value), Err(McprtError::InvalidRequest(_))));
    }

    #[test]
    fn object_and_array_params_are_accepted() {
        let object = serde_json::json!({ "jsonrpc": "2.0", "id": 1, "method": "ping", "params": {"a": 1} });
        let array = serde_json::json!({ "jsonrpc": "2.0", "id": 1, "method": "ping", "params": [1, 2] });
        assert!(classify(object).is_ok());
        assert!(classify(array).is_ok());
    }

    #[test]
    fn string_and_numeric_ids_both_classify() {
        let numeric = serde_json::json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" });
        let string = serde_json::json!({ "jsonrpc": "2.0", "id": "abc", "method": "ping" });
        assert!(matches!(classify(numeric).unwrap(), Envelope::Request { id: RequestId::Number(1), .. }));
        assert!(matches!(classify(string).unwrap(), Envelope::Request { id: RequestId::String(ref s), .. } if s == "abc"));
    }
}
