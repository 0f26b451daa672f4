//! Token and client-identity types shared across the subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An OAuth 2.1 token response, normalized into an absolute expiry timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    /// The bearer access token.
    pub access_token: String,
    /// Token type, typically `"Bearer"`.
    pub token_type: String,
    /// Absolute UTC expiry. `None` means the server didn't advertise one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token, if the server issued one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Space-separated granted scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl OAuthToken {
    /// Whether this token has actually expired: `now >= expires_at`. Tokens
    /// with no `expires_at` never expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            None => false,
            Some(expires_at) => Utc::now() >= expires_at,
        }
    }

    /// Whether this token is close enough to expiry that it should be
    /// refreshed eagerly: `now + 5 minutes >= expires_at`. Distinct from
    /// [`Self::is_expired`] — a token can be "expiring soon" well before it
    /// is actually unusable, which is exactly when a caller should refresh
    /// ahead of its own in-flight requests hitting the expiry.
    pub fn expires_soon(&self) -> bool {
        match self.expires_at {
            None => false,
            Some(expires_at) => Utc::now() + chrono::Duration::minutes(5) >= expires_at,
        }
    }

    /// The `Authorization` header value for this token. `"bearer"` in any
    /// letter case is rendered as the canonical `"Bearer"`; any other
    /// `token_type` is sent verbatim, case preserved.
    pub fn to_header(&self) -> String {
        if self.token_type.eq_ignore_ascii_case("bearer") {
            format!("Bearer {}", self.access_token)
        } else {
            format!("{} {}", self.token_type, self.access_token)
        }
    }

    pub(crate) fn from_token_response(raw: TokenResponse) -> Self {
        let expires_at = raw
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
        Self {
            access_token: raw.access_token,
            token_type: raw.token_type,
            expires_at,
            refresh_token: raw.refresh_token,
            scope: raw.scope,
        }
    }
}

/// Raw JSON shape of a token endpoint response, before normalization.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// The `client_id`/`client_secret` pair a client authenticates itself with,
/// however it was obtained (static config, DCR, or a client-id metadata URL).
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// The client identifier.
    pub client_id: String,
    /// The client secret, for confidential clients. Public clients using
    /// PKCE leave this `None`.
    pub client_secret: Option<String>,
}

/// The result of Dynamic Client Registration (RFC 7591), cached per
/// authorization server so `authorize()` doesn't re-register on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    /// The assigned client identifier.
    pub client_id: String,
    /// The assigned client secret, for confidential clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_with_no_expiry_never_expires() {
        let token = OAuthToken {
            access_token: "tok".into(),
            token_type: "Bearer".into(),
            expires_at: None,
            refresh_token: None,
            scope: None,
        };
        assert!(!token.is_expired());
    }

    #[test]
    fn token_within_five_minutes_of_expiry_is_expiring_soon_but_not_expired() {
        let token = OAuthToken {
            access_token: "tok".into(),
            token_type: "Bearer".into(),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(30)),
            refresh_token: None,
            scope: None,
        };
        assert!(token.expires_soon());
        assert!(!token.is_expired());
    }

    #[test]
    fn token_past_its_expiry_is_expired() {
        let token = OAuthToken {
            access_token: "tok".into(),
            token_type: "Bearer".into(),
            expires_at: Some(Utc::now() - chrono::Duration::seconds(1)),
            refresh_token: None,
            scope: None,
        };
        assert!(token.is_expired());
        assert!(token.expires_soon());
    }

    #[test]
    fn token_well_before_expiry_is_valid() {
        let token = OAuthToken {
            access_token: "tok".into(),
            token_type: "Bearer".into(),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
            refresh_token: None,
            scope: None,
        };
        assert!(!token.is_expired());
        assert!(!token.expires_soon());
    }

    #[test]
    fn to_header_canonicalizes_bearer_case() {
        let token = OAuthToken {
            access_token: "tok".into(),
            token_type: "bearer".into(),
            expires_at: None,
            refresh_token: None,
            scope: None,
        };
        assert_eq!(token.to_header(), "Bearer tok");
    }

    #[test]
    fn to_header_preserves_non_bearer_scheme_case() {
        let token = OAuthToken {
            access_token: "tok".into(),
            token_type: "DPoP".into(),
            expires_at: None,
            refresh_token: None,
            scope: None,
        };
        assert_eq!(token.to_header(), "DPoP tok");
    }
}
