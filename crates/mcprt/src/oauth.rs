//! Wires `mcprt-auth`'s discovery, dynamic client registration, and
//! authorization flows into a [`mcprt_http::TokenProvider`] an HTTP
//! transport can use (spec §4.9, §6 "OAuth configuration").
//!
//! Grounded on `mcprt_auth::token_provider::OAuthTokenProvider`: that type
//! only ever reads the token store and refreshes, it never runs an initial
//! authorization itself. [`bootstrap`] is the one-time step that resolves
//! discovery and, if the store has no usable token yet, runs the
//! authorization-code (or client-credentials) grant before the provider is
//! handed to the transport.

use std::sync::Arc;

use url::Url;

use mcprt_auth::flow::{FlowConfig, OAuthFlow};
use mcprt_auth::storage::{InMemoryTokenStore, TokenStore};
use mcprt_auth::{discovery, normalize, OAuthTokenProvider};
use mcprt_core::McprtError;

/// Which OAuth 2.1 grant to run when no cached token is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    /// Authorization code with PKCE, via the local browser callback server.
    AuthorizationCode,
    /// Client-credentials, for machine-to-machine sessions.
    ClientCredentials,
}

/// `{redirect_uri?, scope?, grant_type?, storage?, client_name?, client_uri?}`
/// from spec §6, plus the fields `FlowConfig` needs to run a grant.
#[derive(Clone)]
pub struct OAuthConfig {
    /// Which grant to run if the store has no usable token.
    pub grant_type: GrantType,
    /// Space-separated scope requested during authorization.
    pub scope: Option<String>,
    /// Local port the authorization-code callback listener binds to. `0`
    /// picks a free port.
    pub redirect_port: u16,
    /// Skip discovery/DCR and use this client_id directly, if set.
    pub static_client_id: Option<String>,
    /// Paired with `static_client_id` for confidential clients.
    pub static_client_secret: Option<String>,
    /// Name shown to the user and sent during Dynamic Client Registration.
    pub client_name: String,
    /// Token persistence. Defaults to an in-process, non-persistent store.
    pub storage: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("grant_type", &self.grant_type)
            .field("scope", &self.scope)
            .field("client_name", &self.client_name)
            .finish_non_exhaustive()
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            grant_type: GrantType::AuthorizationCode,
            scope: None,
            redirect_port: 0,
            static_client_id: None,
            static_client_secret: None,
            client_name: "mcprt".to_string(),
            storage: Arc::new(InMemoryTokenStore::new()),
        }
    }
}

/// Resolves discovery for `server_url`, runs the configured grant if the
/// store does not already hold a usable token for it, and returns a
/// [`OAuthTokenProvider`] ready to hand to [`mcprt_http::HttpConfig`].
///
/// `server_url` is normalized before it's used as a storage key, so that
/// e.g. `"HTTPS://Host:443/a/"` and `"https://host/a"` share the same
/// cached discovery metadata, client registration, and token instead of
/// being treated as two unrelated sessions.
pub async fn bootstrap(http: reqwest::Client, server_url: &str, config: &OAuthConfig) -> Result<OAuthTokenProvider, McprtError> {
    let resource_url = Url::parse(server_url).map_err(|e| McprtError::InvalidRequest(format!("invalid server url: {e}")))?;
    let key = normalize(server_url);

    let server_metadata = match config
        .storage
        .get_server_metadata(&key)
        .await
        .map_err(|e| McprtError::AuthenticationRequired(e.to_string()))?
    {
        Some(cached) => cached,
        None => {
            let resource_metadata = discovery::fetch_protected_resource_metadata(&http, &resource_url, None)
                .await
                .map_err(|e| McprtError::AuthenticationRequired(e.to_string()))?;
            let issuer = resource_metadata.authorization_servers.first().ok_or_else(|| {
                McprtError::AuthenticationRequired("protected resource metadata named no authorization server".into())
            })?;
            let issuer_url =
                Url::parse(issuer).map_err(|e| McprtError::AuthenticationRequired(format!("invalid issuer url: {e}")))?;
            let metadata = discovery::fetch_authorization_server_metadata(&http, &issuer_url)
                .await
                .map_err(|e| McprtError::AuthenticationRequired(e.to_string()))?;
            config
                .storage
                .set_server_metadata(&key, &metadata)
                .await
                .map_err(|e| McprtError::AuthenticationRequired(e.to_string()))?;
            metadata
        }
    };

    let flow_config = FlowConfig {
        client_name: config.client_name.clone(),
        resource: server_url.to_string(),
        redirect_port: config.redirect_port,
        static_client_id: config.static_client_id.clone(),
        static_client_secret: config.static_client_secret.clone(),
        ..FlowConfig::default()
    };
    let flow = OAuthFlow::new(http, flow_config).with_store(Arc::clone(&config.storage), key.clone());

    let has_usable_token = config
        .storage
        .load(&key)
        .await
        .map_err(|e| McprtError::AuthenticationRequired(e.to_string()))?
        .is_some_and(|t| !t.is_expired());

    if !has_usable_token {
        let token = match config.grant_type {
            GrantType::AuthorizationCode => flow.authorize(&server_metadata, config.scope.as_deref()).await,
            GrantType::ClientCredentials => flow.client_credentials(&server_metadata, config.scope.as_deref()).await,
        }
        .map_err(|e| McprtError::AuthenticationRequired(e.to_string()))?;
        config.storage.save(&key, &token).await.map_err(|e| McprtError::AuthenticationRequired(e.to_string()))?;
    }

    Ok(OAuthTokenProvider::new(key, Arc::clone(&config.storage), flow, server_metadata))
}
