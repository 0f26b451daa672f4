//! JSON-RPC 2.0 envelope codec, error taxonomy, method names, and protocol
//! version negotiation shared by every other crate in the runtime.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod jsonrpc;
pub mod methods;
pub mod version;

pub use error::{McprtError, Result};
pub use jsonrpc::{classify, decode, encode, encode_to_string, validate, Envelope, RequestId};
