//! RFC 7636 PKCE S256 challenge generation.

use base64::Engine as _;
use rand::RngCore as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::discovery::AuthorizationServerMetadata;
use crate::error::{AuthError, Result};

/// A verifier/challenge pair for the PKCE `S256` method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PkceChallenge {
    /// 43-character base64url (no padding) encoding of 32 random bytes.
    /// Sent to the token endpoint as `code_verifier`.
    pub verifier: String,
    /// base64url(SHA-256(verifier)). Sent to the authorization endpoint as
    /// `code_challenge`.
    pub challenge: String,
}

/// Generates a fresh PKCE challenge per RFC 7636 section 4.1/4.2.
pub fn generate() -> PkceChallenge {
    let mut random_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut random_bytes);
    let verifier = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes);
    let digest = Sha256::digest(verifier.as_bytes());
    let challenge = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice());
    PkceChallenge { verifier, challenge }
}

/// Rejects authorization servers that don't advertise PKCE `S256` support.
/// OAuth 2.1 mandates PKCE for all clients; refusing to proceed without it
/// is the correct posture rather than silently falling back to `plain`.
pub fn require_s256_support(metadata: &AuthorizationServerMetadata) -> Result<()> {
    let supported = metadata.code_challenge_methods_supported.as_deref().unwrap_or(&[]);
    if supported.iter().any(|m| m == "S256") {
        Ok(())
    } else {
        Err(AuthError::PkceUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn verifier_is_43_chars_of_base64url() {
        let pkce = generate();
        assert_eq!(pkce.verifier.len(), 43);
        assert!(pkce.verifier.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn challenge_matches_rfc7636_known_answer() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let digest = Sha256::digest(verifier.as_bytes());
        let challenge = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice());
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn successive_generations_are_distinct() {
        let a = generate();
        let b = generate();
        assert_ne!(a.verifier, b.verifier);
        assert_ne!(a.challenge, b.challenge);
    }

    fn metadata(methods: Option<Vec<String>>) -> AuthorizationServerMetadata {
        AuthorizationServerMetadata {
            issuer: "https://auth.example.com".into(),
            authorization_endpoint: "https://auth.example.com/authorize".into(),
            token_endpoint: "https://auth.example.com/token".into(),
            registration_endpoint: None,
            scopes_supported: None,
            response_types_supported: vec!["code".into()],
            grant_types_supported: None,
            code_challenge_methods_supported: methods,
            extra: HashMap::new(),
        }
    }

    #[test]
    fn rejects_when_s256_absent() {
        let err = require_s256_support(&metadata(Some(vec!["plain".into()]))).unwrap_err();
        assert!(matches!(err, AuthError::PkceUnsupported));
    }

    #[test]
    fn rejects_when_methods_unadvertised() {
        assert!(require_s256_support(&metadata(None)).is_err());
    }

    #[test]
    fn accepts_when_s256_present() {
        assert!(require_s256_support(&metadata(Some(vec!["S256".into()]))).is_ok());
    }
}
