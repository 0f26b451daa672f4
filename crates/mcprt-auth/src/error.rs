//! Errors produced by the OAuth 2.1 subsystem.

use thiserror::Error;

/// Failure modes across discovery, registration, and the token flows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A discovery or token endpoint request could not be completed.
    #[error("http request failed: {0}")]
    Http(String),

    /// A metadata document or token response could not be parsed.
    #[error("failed to parse {what}: {source}")]
    Decode {
        /// What was being parsed, for the error message.
        what: &'static str,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// No authorization server advertised itself for the resource.
    #[error("no authorization server metadata found for {0}")]
    DiscoveryFailed(String),

    /// The authorization server does not support PKCE S256.
    #[error("authorization server does not support PKCE S256")]
    PkceUnsupported,

    /// None of the client-id resolution strategies applied.
    #[error("no viable client registration mechanism for this authorization server")]
    NoClientRegistration,

    /// Dynamic Client Registration (RFC 7591) was rejected by the server.
    #[error("dynamic client registration failed: {0}")]
    RegistrationFailed(String),

    /// The resource parameter failed RFC 8707 validation.
    #[error("invalid resource indicator: {0}")]
    InvalidResource(String),

    /// The token endpoint returned a non-success status.
    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint {
        /// HTTP status code returned by the token endpoint.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The `state` value in the redirect callback didn't match what was sent.
    #[error("state mismatch in oauth callback, possible CSRF")]
    StateMismatch,

    /// The redirect callback didn't include an authorization code.
    #[error("authorization code missing from callback")]
    MissingCode,

    /// The local loopback redirect listener could not be started.
    #[error("failed to start oauth callback listener: {0}")]
    CallbackListener(String),

    /// The redirect callback was never received within the configured timeout.
    #[error("timed out waiting for oauth callback")]
    CallbackTimeout,

    /// No token is stored and none can be obtained without user interaction.
    #[error("authentication required but no token is available")]
    AuthenticationRequired,

    /// An invalid URL was supplied or computed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, AuthError>;
