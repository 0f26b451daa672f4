//! RFC 7591 Dynamic Client Registration.

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// A client registration request submitted to an authorization server's
/// registration endpoint.
#[derive(Debug, Clone, Serialize, Default)]
pub struct RegistrationRequest {
    /// Redirect URIs the client will use.
    pub redirect_uris: Vec<String>,
    /// Token endpoint auth method, e.g. `"none"` for public clients using PKCE.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_method: Option<String>,
    /// Grant types the client intends to use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant_types: Option<Vec<String>>,
    /// Response types the client intends to use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_types: Option<Vec<String>>,
    /// Human-readable client name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// Requested scope, space-separated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// PKCE methods the client will use.
    #[serde(rename = "code_challenge_methods", skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods: Option<Vec<String>>,
}

impl RegistrationRequest {
    /// A public-client registration request suitable for an authorization
    /// code + PKCE flow: no auth method, `S256` only.
    pub fn public_client(client_name: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uris: vec![redirect_uri.into()],
            token_endpoint_auth_method: Some("none".to_string()),
            grant_types: Some(vec!["authorization_code".to_string(), "refresh_token".to_string()]),
            response_types: Some(vec!["code".to_string()]),
            client_name: Some(client_name.into()),
            scope: None,
            code_challenge_methods: Some(vec!["S256".to_string()]),
        }
    }
}

/// The authorization server's response to a registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationResponse {
    /// The assigned client identifier.
    pub client_id: String,
    /// The assigned client secret, for confidential clients.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Unix timestamp the secret expires at, `0` meaning it never does.
    #[serde(default)]
    pub client_secret_expires_at: Option<i64>,
}

/// Registers a client against `registration_endpoint`, returning its
/// assigned credentials.
pub async fn register(
    http: &reqwest::Client,
    registration_endpoint: &str,
    request: &RegistrationRequest,
) -> Result<RegistrationResponse> {
    let resp = http
        .post(registration_endpoint)
        .json(request)
        .send()
        .await
        .map_err(|e| AuthError::Http(e.to_string()))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthError::RegistrationFailed(format!("{status}: {body}")));
    }

    resp.json().await.map_err(|e| AuthError::Decode { what: "dynamic client registration response", source: e })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_client_request_has_no_auth_method_secret() {
        let req = RegistrationRequest::public_client("mcprt", "http://127.0.0.1:0/callback");
        assert_eq!(req.token_endpoint_auth_method.as_deref(), Some("none"));
        assert_eq!(req.code_challenge_methods, Some(vec!["S256".to_string()]));
    }

    #[test]
    fn registration_response_deserializes_minimal() {
        let json = r#"{"client_id": "abc123"}"#;
        let resp: RegistrationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.client_id, "abc123");
        assert!(resp.client_secret.is_none());
    }
}
