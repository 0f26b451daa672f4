//! Bridges this crate's OAuth state to [`mcprt_http::TokenProvider`], the
//! seam the HTTP transports call into for bearer tokens and 401 recovery.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex as TokioMutex;

use mcprt_http::TokenProvider;
use mcprt_transport::{TransportError, TransportResult};

use crate::discovery::AuthorizationServerMetadata;
use crate::flow::OAuthFlow;
use crate::storage::TokenStore;

/// A [`TokenProvider`] backed by a token store and an [`OAuthFlow`]. Reads
/// attach the cached access token unless it is expired (never bothering the
/// transport with token that will 401); a 401 triggers a refresh-token
/// exchange, one attempt, exactly the discipline `mcprt-http` expects.
pub struct OAuthTokenProvider {
    key: String,
    store: Arc<dyn TokenStore>,
    flow: OAuthFlow,
    server_metadata: AuthorizationServerMetadata,
    cached: TokioMutex<()>,
}

impl std::fmt::Debug for OAuthTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokenProvider").field("key", &self.key).finish_non_exhaustive()
    }
}

impl OAuthTokenProvider {
    /// Builds a provider for the session identified by `key`, whose tokens
    /// live in `store` and whose authorization server is `server_metadata`.
    pub fn new(key: impl Into<String>, store: Arc<dyn TokenStore>, flow: OAuthFlow, server_metadata: AuthorizationServerMetadata) -> Self {
        Self { key: key.into(), store, flow, server_metadata, cached: TokioMutex::new(()) }
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenProvider {
    async fn token(&self) -> Option<String> {
        let token = self.store.load(&self.key).await.ok().flatten()?;
        if token.is_expired() {
            return None;
        }
        if token.expires_soon() && token.refresh_token.is_some() {
            // Eager refresh ahead of actual expiry so in-flight requests
            // never race a token that goes stale mid-call. Fall back to the
            // still-valid cached token if the refresh attempt fails.
            if let Ok(header) = self.refresh().await {
                return Some(header);
            }
        }
        Some(token.to_header())
    }

    async fn refresh(&self) -> TransportResult<String> {
        // Serialize concurrent refreshes for the same session so two racing
        // 401s don't both spend the one refresh token.
        let _guard = self.cached.lock().await;

        if let Some(existing) = self.store.load(&self.key).await.ok().flatten()
            && !existing.is_expired()
            && !existing.expires_soon()
        {
            return Ok(existing.to_header());
        }

        let refresh_token = self
            .store
            .load(&self.key)
            .await
            .ok()
            .flatten()
            .and_then(|t| t.refresh_token)
            .ok_or_else(|| TransportError::Unauthorized("no refresh token available".into()))?;

        let token = self
            .flow
            .refresh(&self.server_metadata, &refresh_token)
            .await
            .map_err(|e| TransportError::Unauthorized(e.to_string()))?;

        let header = token.to_header();
        self.store
            .save(&self.key, &token)
            .await
            .map_err(|e| TransportError::Unauthorized(e.to_string()))?;

        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowConfig;
    use crate::storage::InMemoryTokenStore;
    use crate::types::OAuthToken;
    use std::collections::HashMap;

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

    #[tokio::test]
    async fn token_returns_none_when_store_is_empty() {
        let store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
        let flow = OAuthFlow::new(reqwest::Client::new(), FlowConfig::default());
        let provider = OAuthTokenProvider::new("srv", store, flow, server_metadata());
        assert!(provider.token().await.is_none());
    }

    #[tokio::test]
    async fn token_returns_cached_access_token_when_fresh() {
        let store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
        store
            .save(
                "srv",
                &OAuthToken {
                    access_token: "abc".into(),
                    token_type: "Bearer".into(),
                    expires_at: Some(chrono::Utc::now() + chrono::Duration::hours(1)),
                    refresh_token: Some("refresh".into()),
                    scope: None,
                },
            )
            .await
            .unwrap();
        let flow = OAuthFlow::new(reqwest::Client::new(), FlowConfig::default());
        let provider = OAuthTokenProvider::new("srv", store, flow, server_metadata());
        assert_eq!(provider.token().await, Some("Bearer abc".to_string()));
    }

    #[tokio::test]
    async fn token_close_to_expiry_without_reachable_refresh_endpoint_falls_back_to_cached_header() {
        let store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
        store
            .save(
                "srv",
                &OAuthToken {
                    access_token: "abc".into(),
                    token_type: "Bearer".into(),
                    expires_at: Some(chrono::Utc::now() + chrono::Duration::seconds(30)),
                    refresh_token: Some("refresh".into()),
                    scope: None,
                },
            )
            .await
            .unwrap();
        let flow = OAuthFlow::new(reqwest::Client::new(), FlowConfig::default());
        let provider = OAuthTokenProvider::new("srv", store, flow, server_metadata());
        // The refresh token endpoint is unreachable in this test, so the
        // eager refresh attempt fails and the still-valid cached token wins.
        assert_eq!(provider.token().await, Some("Bearer abc".to_string()));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_is_unauthorized() {
        let store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
        store
            .save(
                "srv",
                &OAuthToken {
                    access_token: "abc".into(),
                    token_type: "Bearer".into(),
                    expires_at: Some(chrono::Utc::now() - chrono::Duration::seconds(1)),
                    refresh_token: None,
                    scope: None,
                },
            )
            .await
            .unwrap();
        let flow = OAuthFlow::new(reqwest::Client::new(), FlowConfig::default());
        let provider = OAuthTokenProvider::new("srv", store, flow, server_metadata());
        let err = provider.refresh().await.unwrap_err();
        assert!(matches!(err, TransportError::Unauthorized(_)));
    }
}
