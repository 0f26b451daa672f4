//! The authorization-code-with-PKCE and client-credentials OAuth 2.1 flows.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use rand::RngCore as _;
use subtle::ConstantTimeEq as _;
use tracing::{debug, info};
use url::Url;

use crate::browser;
use crate::dcr::{self, RegistrationRequest};
use crate::discovery::AuthorizationServerMetadata;
use crate::error::{AuthError, Result};
use crate::pkce;
use crate::resource::validate_resource_uri;
use crate::storage::TokenStore;
use crate::types::{ClientInfo, OAuthToken, TokenResponse};

/// Parameters for one MCP server's OAuth 2.1 flow.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Name shown to the user and sent during Dynamic Client Registration.
    pub client_name: String,
    /// The `resource` parameter (RFC 8707): the MCP server's own URL.
    pub resource: String,
    /// Local port for the redirect listener. `0` picks a free port.
    pub redirect_port: u16,
    /// Skip discovery/DCR and use this client_id directly, if set.
    pub static_client_id: Option<String>,
    /// Paired with `static_client_id` for confidential clients.
    pub static_client_secret: Option<String>,
    /// How long to wait for the user to complete the browser redirect.
    pub callback_timeout: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            client_name: "mcprt".to_string(),
            resource: String::new(),
            redirect_port: 0,
            static_client_id: None,
            static_client_secret: None,
            callback_timeout: Duration::from_secs(300),
        }
    }
}

/// Drives the OAuth 2.1 authorization code flow (with PKCE) and the
/// client-credentials flow for one MCP server.
pub struct OAuthFlow {
    http: reqwest::Client,
    config: FlowConfig,
    store: Option<(Arc<dyn TokenStore>, String)>,
}

impl OAuthFlow {
    /// Builds a flow driver sharing `http` with the rest of the session.
    pub fn new(http: reqwest::Client, config: FlowConfig) -> Self {
        Self { http, config, store: None }
    }

    /// Attaches a token store and its (already normalized) key so that
    /// Dynamic Client Registration results are cached rather than redone on
    /// every [`Self::authorize`] call.
    pub fn with_store(mut self, store: Arc<dyn TokenStore>, key: impl Into<String>) -> Self {
        self.store = Some((store, key.into()));
        self
    }

    /// Resolves the resource server's own authorization server and runs the
    /// full browser-based authorization code flow with PKCE.
    pub async fn authorize(&self, server_metadata: &AuthorizationServerMetadata, scope: Option<&str>) -> Result<OAuthToken> {
        pkce::require_s256_support(server_metadata)?;
        let resource = validate_resource_uri(&self.config.resource)?;

        let client_id = self.resolve_client_id(server_metadata).await?;
        let challenge = pkce::generate();
        let state = generate_state();

        let listener = browser::CallbackListener::bind(self.config.redirect_port)?;
        let redirect_uri = listener.redirect_uri().to_string();

        let auth_url = self.build_authorization_url(
            server_metadata,
            &client_id,
            &redirect_uri,
            scope,
            &state,
            &challenge.challenge,
            &resource,
        )?;

        eprintln!("Open the following URL in your browser to authorize:\n{auth_url}");
        if !browser::open(&auth_url) {
            debug!("failed to launch system browser, user must open the URL manually");
        }

        let callback = listener.wait(self.config.callback_timeout).await?;
        if callback.state.as_bytes().ct_eq(state.as_bytes()).unwrap_u8() != 1 {
            return Err(AuthError::StateMismatch);
        }

        let token = self.exchange_code(server_metadata, &callback.code, &redirect_uri, &client_id, &challenge.verifier, &resource).await?;
        info!(issuer = %server_metadata.issuer, "authorization code flow completed");
        Ok(token)
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, server_metadata: &AuthorizationServerMetadata, refresh_token: &str) -> Result<OAuthToken> {
        let resource = validate_resource_uri(&self.config.resource)?;
        let mut params: HashMap<&str, &str> = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("resource", &resource);
        self.post_token(&server_metadata.token_endpoint, &params).await
    }

    /// Runs the client-credentials grant for machine-to-machine auth.
    pub async fn client_credentials(&self, server_metadata: &AuthorizationServerMetadata, scope: Option<&str>) -> Result<OAuthToken> {
        let client_id = self
            .config
            .static_client_id
            .as_deref()
            .ok_or(AuthError::NoClientRegistration)?;
        let client_secret = self.config.static_client_secret.as_deref().unwrap_or_default();
        let resource = validate_resource_uri(&self.config.resource)?;

        let mut params: HashMap<&str, &str> = HashMap::new();
        params.insert("grant_type", "client_credentials");
        params.insert("client_id", client_id);
        params.insert("client_secret", client_secret);
        params.insert("resource", &resource);
        if let Some(s) = scope {
            params.insert("scope", s);
        }
        self.post_token(&server_metadata.token_endpoint, &params).await
    }

    async fn post_token(&self, token_endpoint: &str, params: &HashMap<&str, &str>) -> Result<OAuthToken> {
        let resp = self.http.post(token_endpoint).form(params).send().await.map_err(|e| AuthError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::TokenEndpoint { status, body });
        }
        let raw: TokenResponse =
            resp.json().await.map_err(|e| AuthError::Decode { what: "token endpoint response", source: e })?;
        Ok(OAuthToken::from_token_response(raw))
    }

    /// Resolves `client_id` in priority order: static configuration, a
    /// cached registration for this server, then a fresh Dynamic Client
    /// Registration (RFC 7591), which is cached for next time.
    async fn resolve_client_id(&self, server_metadata: &AuthorizationServerMetadata) -> Result<String> {
        if let Some(id) = &self.config.static_client_id {
            return Ok(id.clone());
        }

        if let Some((store, key)) = &self.store
            && let Some(info) = store.get_client_info(key).await.ok().flatten()
        {
            debug!(%key, "reusing cached client registration");
            return Ok(info.client_id);
        }

        let registration_endpoint =
            server_metadata.registration_endpoint.as_deref().ok_or(AuthError::NoClientRegistration)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", self.config.redirect_port);
        let request = RegistrationRequest::public_client(self.config.client_name.clone(), redirect_uri);
        let response = dcr::register(&self.http, registration_endpoint, &request).await?;

        if let Some((store, key)) = &self.store {
            let info = ClientInfo { client_id: response.client_id.clone(), client_secret: response.client_secret.clone() };
            if let Err(e) = store.set_client_info(key, &info).await {
                debug!(error = %e, "failed to cache client registration, will re-register next time");
            }
        }

        Ok(response.client_id)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_authorization_url(
        &self,
        server_metadata: &AuthorizationServerMetadata,
        client_id: &str,
        redirect_uri: &str,
        scope: Option<&str>,
        state: &str,
        code_challenge: &str,
        resource: &str,
    ) -> Result<String> {
        let mut url = Url::parse(&server_metadata.authorization_endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", client_id);
            query.append_pair("redirect_uri", redirect_uri);
            if let Some(s) = scope {
                query.append_pair("scope", s);
            }
            query.append_pair("state", state);
            query.append_pair("code_challenge", code_challenge);
            query.append_pair("code_challenge_method", "S256");
            query.append_pair("resource", resource);
        }
        Ok(url.to_string())
    }

    async fn exchange_code(
        &self,
        server_metadata: &AuthorizationServerMetadata,
        code: &str,
        redirect_uri: &str,
        client_id: &str,
        code_verifier: &str,
        resource: &str,
    ) -> Result<OAuthToken> {
        let secret_owned;
        let mut params: HashMap<&str, &str> = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("redirect_uri", redirect_uri);
        params.insert("client_id", client_id);
        params.insert("code_verifier", code_verifier);
        params.insert("resource", resource);
        if let Some(secret) = &self.config.static_client_secret {
            secret_owned = secret.clone();
            params.insert("client_secret", &secret_owned);
        }
        self.post_token(&server_metadata.token_endpoint, &params).await
    }
}

fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_metadata() -> AuthorizationServerMetadata {
        AuthorizationServerMetadata {
            issuer: "https://auth.example.com".into(),
            authorization_endpoint: "https://auth.example.com/authorize".into(),
            token_endpoint: "https://auth.example.com/token".into(),
            registration_endpoint: None,
            scopes_supported: None,
            response_types_supported: vec!["code".into()],
            grant_types_supported: None,
            code_challenge_methods_supported: Some(vec!["S256".into()]),
            extra: HashMap::new(),
        }
    }

    #[test]
    fn state_values_are_unique() {
        assert_ne!(generate_state(), generate_state());
    }

    #[test]
    fn state_is_at_least_32_bytes_of_entropy() {
        // base64url (no padding) of 32 raw bytes is 43 characters.
        assert!(generate_state().len() >= 43);
    }

    #[test]
    fn authorization_url_carries_pkce_and_resource_params() {
        let flow = OAuthFlow::new(
            reqwest::Client::new(),
            FlowConfig { resource: "https://api.example.com/mcp".into(), static_client_id: Some("cid".into()), ..Default::default() },
        );
        let url = flow
            .build_authorization_url(
                &server_metadata(),
                "cid",
                "http://127.0.0.1:0/callback",
                Some("tools"),
                "state123",
                "challenge_abc",
                "https://api.example.com/mcp",
            )
            .unwrap();
        assert!(url.contains("response_type=code"));
        assert!(url.contains("code_challenge=challenge_abc"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("state=state123"));
        assert!(url.contains("scope=tools"));
        assert!(url.contains("resource=https"));
    }

    #[tokio::test]
    async fn resolve_client_id_prefers_static_over_registration() {
        let flow = OAuthFlow::new(
            reqwest::Client::new(),
            FlowConfig { static_client_id: Some("configured".into()), ..Default::default() },
        );
        let client_id = flow.resolve_client_id(&server_metadata()).await.unwrap();
        assert_eq!(client_id, "configured");
    }

    #[tokio::test]
    async fn resolve_client_id_errors_without_registration_endpoint() {
        let flow = OAuthFlow::new(reqwest::Client::new(), FlowConfig::default());
        let err = flow.resolve_client_id(&server_metadata()).await.unwrap_err();
        assert!(matches!(err, AuthError::NoClientRegistration));
    }

    #[tokio::test]
    async fn resolve_client_id_reuses_a_cached_registration_without_hitting_the_endpoint() {
        use crate::storage::InMemoryTokenStore;

        let store: std::sync::Arc<dyn TokenStore> = std::sync::Arc::new(InMemoryTokenStore::new());
        store
            .set_client_info("srv", &ClientInfo { client_id: "cached-id".into(), client_secret: None })
            .await
            .unwrap();

        // No registration_endpoint is set on this metadata, so a real DCR
        // attempt would fail with NoClientRegistration; success here proves
        // the cache was consulted first.
        let flow = OAuthFlow::new(reqwest::Client::new(), FlowConfig::default()).with_store(store, "srv");
        let client_id = flow.resolve_client_id(&server_metadata()).await.unwrap();
        assert_eq!(client_id, "cached-id");
    }
}
