//! OAuth 2.1 client subsystem for the MCP client runtime.
//!
//! Covers RFC 9728 (Protected Resource Metadata) and RFC 8414 / OIDC
//! discovery, RFC 7591 Dynamic Client Registration, RFC 7636 PKCE, RFC 8707
//! resource indicators, and the authorization-code and client-credentials
//! grants. [`token_provider::OAuthTokenProvider`] implements
//! `mcprt_http::TokenProvider`, the seam the HTTP transports call into.

#![warn(missing_docs)]

pub mod browser;
pub mod dcr;
pub mod discovery;
pub mod error;
pub mod flow;
pub mod normalize;
pub mod pkce;
pub mod resource;
pub mod storage;
pub mod token_provider;
pub mod types;

pub use dcr::{RegistrationRequest, RegistrationResponse};
pub use discovery::{AuthorizationServerMetadata, ProtectedResourceMetadata};
pub use error::{AuthError, Result};
pub use flow::{FlowConfig, OAuthFlow};
pub use normalize::normalize;
pub use pkce::PkceChallenge;
pub use resource::validate_resource_uri;
pub use storage::{InMemoryTokenStore, TokenStore};
pub use token_provider::OAuthTokenProvider;
pub use types::{ClientCredentials, ClientInfo, OAuthToken};
