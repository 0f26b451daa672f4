//! Persistence for everything a session needs to avoid repeating discovery,
//! registration, and the authorization handshake on every run.
//!
//! Callers that need this state to survive process restarts implement
//! [`TokenStore`] against their own credential store (OS keyring, encrypted
//! file, secrets manager); [`InMemoryTokenStore`] is the process-lifetime
//! default. Every key is a server URL normalized with
//! [`crate::normalize::normalize`].

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::discovery::AuthorizationServerMetadata;
use crate::error::Result;
use crate::pkce::PkceChallenge;
use crate::types::{ClientInfo, OAuthToken};

/// Persists tokens, cached discovery/registration results, and in-flight
/// authorization-code state, all keyed by normalized server URL.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug {
    /// Save or overwrite the token for `key`.
    async fn save(&self, key: &str, token: &OAuthToken) -> Result<()>;

    /// Load the token for `key`, if one exists.
    async fn load(&self, key: &str) -> Result<Option<OAuthToken>>;

    /// Remove the token for `key`. A no-op if none exists.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Load the cached Dynamic Client Registration result for `key`, if any.
    async fn get_client_info(&self, key: &str) -> Result<Option<ClientInfo>>;

    /// Cache a client registration result for `key`.
    async fn set_client_info(&self, key: &str, info: &ClientInfo) -> Result<()>;

    /// Load the cached authorization server metadata for `key`, if any.
    async fn get_server_metadata(&self, key: &str) -> Result<Option<AuthorizationServerMetadata>>;

    /// Cache authorization server metadata for `key`.
    async fn set_server_metadata(&self, key: &str, metadata: &AuthorizationServerMetadata) -> Result<()>;

    /// Load the PKCE challenge in flight for `key`, if any.
    async fn get_pkce(&self, key: &str) -> Result<Option<PkceChallenge>>;

    /// Save the PKCE challenge generated for the authorization request in
    /// flight for `key`.
    async fn set_pkce(&self, key: &str, pkce: &PkceChallenge) -> Result<()>;

    /// Remove the PKCE challenge for `key` once the code exchange
    /// completes (or the attempt is abandoned).
    async fn delete_pkce(&self, key: &str) -> Result<()>;

    /// Load the `state` value sent with the authorization request in
    /// flight for `key`, if any.
    async fn get_state(&self, key: &str) -> Result<Option<String>>;

    /// Save the `state` value sent with the authorization request in
    /// flight for `key`.
    async fn set_state(&self, key: &str, state: &str) -> Result<()>;

    /// Remove the `state` value for `key` once the callback is validated
    /// (or the attempt is abandoned).
    async fn delete_state(&self, key: &str) -> Result<()>;
}

/// A [`TokenStore`] backed by `HashMap`s behind `std::sync::RwLock`s. Nothing
/// survives process restart.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<String, OAuthToken>>,
    client_info: RwLock<HashMap<String, ClientInfo>>,
    server_metadata: RwLock<HashMap<String, AuthorizationServerMetadata>>,
    pkce: RwLock<HashMap<String, PkceChallenge>>,
    state: RwLock<HashMap<String, String>>,
}

impl InMemoryTokenStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn save(&self, key: &str, token: &OAuthToken) -> Result<()> {
        self.tokens.write().expect("token store lock poisoned").insert(key.to_string(), token.clone());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<OAuthToken>> {
        Ok(self.tokens.read().expect("token store lock poisoned").get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.tokens.write().expect("token store lock poisoned").remove(key);
        Ok(())
    }

    async fn get_client_info(&self, key: &str) -> Result<Option<ClientInfo>> {
        Ok(self.client_info.read().expect("client info lock poisoned").get(key).cloned())
    }

    async fn set_client_info(&self, key: &str, info: &ClientInfo) -> Result<()> {
        self.client_info.write().expect("client info lock poisoned").insert(key.to_string(), info.clone());
        Ok(())
    }

    async fn get_server_metadata(&self, key: &str) -> Result<Option<AuthorizationServerMetadata>> {
        Ok(self.server_metadata.read().expect("server metadata lock poisoned").get(key).cloned())
    }

    async fn set_server_metadata(&self, key: &str, metadata: &AuthorizationServerMetadata) -> Result<()> {
        self.server_metadata.write().expect("server metadata lock poisoned").insert(key.to_string(), metadata.clone());
        Ok(())
    }

    async fn get_pkce(&self, key: &str) -> Result<Option<PkceChallenge>> {
        Ok(self.pkce.read().expect("pkce lock poisoned").get(key).cloned())
    }

    async fn set_pkce(&self, key: &str, pkce: &PkceChallenge) -> Result<()> {
        self.pkce.write().expect("pkce lock poisoned").insert(key.to_string(), pkce.clone());
        Ok(())
    }

    async fn delete_pkce(&self, key: &str) -> Result<()> {
        self.pkce.write().expect("pkce lock poisoned").remove(key);
        Ok(())
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.read().expect("state lock poisoned").get(key).cloned())
    }

    async fn set_state(&self, key: &str, state: &str) -> Result<()> {
        self.state.write().expect("state lock poisoned").insert(key.to_string(), state.to_string());
        Ok(())
    }

    async fn delete_state(&self, key: &str) -> Result<()> {
        self.state.write().expect("state lock poisoned").remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    fn token(access: &str) -> OAuthToken {
        OAuthToken { access_token: access.into(), token_type: "Bearer".into(), expires_at: None, refresh_token: None, scope: None }
    }

    #[tokio::test]
    async fn save_then_load_returns_the_token() {
        let store = InMemoryTokenStore::new();
        store.save("srv", &token("abc")).await.unwrap();
        let loaded = store.load("srv").await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "abc");
    }

    #[tokio::test]
    async fn load_of_unknown_key_is_none() {
        let store = InMemoryTokenStore::new();
        assert!(store.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryTokenStore::new();
        store.save("srv", &token("abc")).await.unwrap();
        store.delete("srv").await.unwrap();
        store.delete("srv").await.unwrap();
        assert!(store.load("srv").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn client_info_round_trips() {
        let store = InMemoryTokenStore::new();
        let info = ClientInfo { client_id: "cid".into(), client_secret: Some("secret".into()) };
        store.set_client_info("srv", &info).await.unwrap();
        let loaded = store.get_client_info("srv").await.unwrap().unwrap();
        assert_eq!(loaded.client_id, "cid");
        assert_eq!(loaded.client_secret.as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn server_metadata_round_trips() {
        let store = InMemoryTokenStore::new();
        let metadata = AuthorizationServerMetadata {
            issuer: "https://auth.example.com".into(),
            authorization_endpoint: "https://auth.example.com/authorize".into(),
            token_endpoint: "https://auth.example.com/token".into(),
            registration_endpoint: None,
            scopes_supported: None,
            response_types_supported: vec!["code".into()],
            grant_types_supported: None,
            code_challenge_methods_supported: None,
            extra: StdHashMap::new(),
        };
        store.set_server_metadata("srv", &metadata).await.unwrap();
        let loaded = store.get_server_metadata("srv").await.unwrap().unwrap();
        assert_eq!(loaded.issuer, "https://auth.example.com");
    }

    #[tokio::test]
    async fn pkce_is_stored_then_deletable() {
        let store = InMemoryTokenStore::new();
        let pkce = crate::pkce::generate();
        store.set_pkce("srv", &pkce).await.unwrap();
        assert_eq!(store.get_pkce("srv").await.unwrap().unwrap().verifier, pkce.verifier);
        store.delete_pkce("srv").await.unwrap();
        assert!(store.get_pkce("srv").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn state_is_stored_then_deletable() {
        let store = InMemoryTokenStore::new();
        store.set_state("srv", "xyz").await.unwrap();
        assert_eq!(store.get_state("srv").await.unwrap().as_deref(), Some("xyz"));
        store.delete_state("srv").await.unwrap();
        assert!(store.get_state("srv").await.unwrap().is_none());
    }
}
