//! RFC 9728 Protected Resource Metadata and RFC 8414 / OIDC Discovery.
//!
//! Sequence: a 401 from the resource server carries a `WWW-Authenticate`
//! header that may point at a protected-resource metadata document; that
//! document names one or more authorization servers; each is probed at up
//! to five well-known locations for its own metadata.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{AuthError, Result};
use crate::normalize::normalize;

/// RFC 9728 protected resource metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// The resource server's own identifier URI.
    pub resource: String,
    /// Issuer URIs of authorization servers that protect this resource.
    pub authorization_servers: Vec<String>,
    /// Scopes the resource server supports, if advertised.
    #[serde(default)]
    pub scopes_supported: Option<Vec<String>>,
    /// Supported bearer token presentation methods (e.g. `"header"`).
    #[serde(default)]
    pub bearer_methods_supported: Option<Vec<String>>,
}

/// RFC 8414 / OpenID Connect Discovery 1.0 authorization server metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    /// Issuer identifier for this authorization server.
    pub issuer: String,
    /// Authorization endpoint (RFC 6749 section 3.1).
    pub authorization_endpoint: String,
    /// Token endpoint (RFC 6749 section 3.2).
    pub token_endpoint: String,
    /// Dynamic Client Registration endpoint (RFC 7591), if supported.
    #[serde(default)]
    pub registration_endpoint: Option<String>,
    /// Scopes the server supports.
    #[serde(default)]
    pub scopes_supported: Option<Vec<String>>,
    /// `response_type` values the server supports.
    pub response_types_supported: Vec<String>,
    /// `grant_type` values the server supports.
    #[serde(default)]
    pub grant_types_supported: Option<Vec<String>>,
    /// PKCE challenge methods the server supports.
    #[serde(default)]
    pub code_challenge_methods_supported: Option<Vec<String>>,
    /// Fields not modeled explicitly above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn parse_resource_metadata_url(www_authenticate: &str) -> Option<String> {
    let key = "resource_metadata=";
    let pos = www_authenticate.find(key)?;
    let rest = &www_authenticate[pos + key.len()..];
    if let Some(inner) = rest.strip_prefix('"') {
        let end = inner.find('"')?;
        Some(inner[..end].to_string())
    } else {
        let end = rest.find(|c: char| c.is_whitespace() || c == ',').unwrap_or(rest.len());
        Some(rest[..end].to_string())
    }
}

/// Whether `meta_resource` is the same as, or a normalized prefix of, the
/// resource URL that was actually requested — RFC 9728's guard against a
/// metadata document claiming coverage it wasn't asked to provide.
fn resource_covers(meta_resource: &str, requested: &Url) -> bool {
    let requested_n = normalize(requested.as_str());
    let meta_n = normalize(meta_resource);
    requested_n == meta_n || requested_n.starts_with(&meta_n)
}

/// Fetches the protected resource metadata for `resource_url`. Prefers the
/// `resource_metadata` URL embedded in a `401`'s `WWW-Authenticate` header,
/// falling back to the RFC 9728 well-known path. Either way, the metadata's
/// `resource` field must cover the URL that was actually requested.
pub async fn fetch_protected_resource_metadata(
    http: &reqwest::Client,
    resource_url: &Url,
    www_authenticate: Option<&str>,
) -> Result<ProtectedResourceMetadata> {
    if let Some(header) = www_authenticate
        && let Some(meta_url) = parse_resource_metadata_url(header)
        && let Ok(meta_url) = Url::parse(&meta_url)
        && let Ok(resp) = http.get(meta_url).send().await
        && resp.status().is_success()
        && let Ok(meta) = resp.json::<ProtectedResourceMetadata>().await
    {
        if resource_covers(&meta.resource, resource_url) {
            return Ok(meta);
        }
        debug!(
            resource = %meta.resource,
            requested = %resource_url,
            "resource metadata from www-authenticate hint doesn't cover the requested resource, falling back to well-known"
        );
    }

    let path = resource_url.path();
    let well_known_path = if path.is_empty() || path == "/" {
        "/.well-known/oauth-protected-resource".to_string()
    } else {
        format!("/.well-known/oauth-protected-resource{path}")
    };
    let mut well_known_url = resource_url.clone();
    well_known_url.set_path(&well_known_path);
    well_known_url.set_query(None);
    well_known_url.set_fragment(None);

    let resp = http
        .get(well_known_url)
        .send()
        .await
        .map_err(|e| AuthError::Http(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(AuthError::DiscoveryFailed(resource_url.to_string()));
    }
    let meta: ProtectedResourceMetadata =
        resp.json().await.map_err(|e| AuthError::Decode { what: "protected resource metadata", source: e })?;
    if !resource_covers(&meta.resource, resource_url) {
        return Err(AuthError::DiscoveryFailed(resource_url.to_string()));
    }
    Ok(meta)
}

/// Builds the five well-known candidate URLs tried, in order, by
/// [`fetch_authorization_server_metadata`].
fn build_as_candidate_urls(issuer: &Url) -> Vec<Url> {
    let path = issuer.path().trim_end_matches('/').to_string();
    let origin = match issuer.port() {
        Some(port) => format!("{}://{}:{port}", issuer.scheme(), issuer.host_str().unwrap_or_default()),
        None => format!("{}://{}", issuer.scheme(), issuer.host_str().unwrap_or_default()),
    };

    let mut candidates = Vec::with_capacity(5);
    let push = |candidates: &mut Vec<Url>, s: String| {
        if let Ok(u) = Url::parse(&s) {
            candidates.push(u);
        }
    };

    push(&mut candidates, format!("{origin}/.well-known/oauth-authorization-server{path}"));
    push(&mut candidates, format!("{origin}/.well-known/openid-configuration{path}"));
    {
        let mut appended = issuer.clone();
        appended.set_path(&format!("{path}/.well-known/openid-configuration"));
        appended.set_query(None);
        appended.set_fragment(None);
        candidates.push(appended);
    }
    push(&mut candidates, format!("{origin}/.well-known/oauth-authorization-server"));
    push(&mut candidates, format!("{origin}/.well-known/openid-configuration"));

    candidates
}

/// Fetches authorization server metadata, trying the five well-known
/// orderings RFC 8414 and OIDC Discovery define, in order. A candidate whose
/// `issuer` doesn't match the authorization server we asked about is
/// rejected and the next candidate is tried; if every well-formed candidate
/// mismatches, the first one is accepted as a legacy-compatibility
/// last resort (logged at `info`, since it waives a security check).
pub async fn fetch_authorization_server_metadata(
    http: &reqwest::Client,
    issuer: &Url,
) -> Result<AuthorizationServerMetadata> {
    let expected = normalize(issuer.as_str());
    let mut legacy_fallback: Option<AuthorizationServerMetadata> = None;

    for candidate in build_as_candidate_urls(issuer) {
        let Ok(resp) = http.get(candidate.clone()).send().await else {
            debug!(%candidate, "authorization server metadata probe unreachable");
            continue;
        };
        if !resp.status().is_success() {
            debug!(%candidate, status = %resp.status(), "authorization server metadata probe missed");
            continue;
        }
        let Ok(meta) = resp.json::<AuthorizationServerMetadata>().await else {
            continue;
        };

        if normalize(&meta.issuer) == expected {
            return Ok(meta);
        }

        debug!(
            %candidate,
            issuer = %meta.issuer,
            expected = %expected,
            "authorization server metadata issuer mismatch, trying next candidate"
        );
        if legacy_fallback.is_none() {
            legacy_fallback = Some(meta);
        }
    }

    if let Some(meta) = legacy_fallback {
        info!(
            issuer = %meta.issuer,
            expected = %expected,
            "accepting authorization server metadata despite issuer mismatch as a legacy-compatibility fallback"
        );
        return Ok(meta);
    }

    Err(AuthError::DiscoveryFailed(issuer.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_resource_metadata_url() {
        let header = r#"Bearer realm="x", resource_metadata="https://api.example.com/.well-known/oauth-protected-resource""#;
        assert_eq!(
            parse_resource_metadata_url(header),
            Some("https://api.example.com/.well-known/oauth-protected-resource".to_string())
        );
    }

    #[test]
    fn parses_unquoted_resource_metadata_url() {
        let header = "Bearer resource_metadata=https://api.example.com/meta";
        assert_eq!(parse_resource_metadata_url(header), Some("https://api.example.com/meta".to_string()));
    }

    #[test]
    fn absent_resource_metadata_url_is_none() {
        assert!(parse_resource_metadata_url(r#"Bearer error="invalid_token""#).is_none());
    }

    #[test]
    fn resource_covers_accepts_exact_and_prefix_matches() {
        let requested = Url::parse("https://api.example.com/mcp").unwrap();
        assert!(resource_covers("https://api.example.com/mcp", &requested));
        assert!(resource_covers("https://api.example.com", &requested));
        assert!(!resource_covers("https://other.example.com", &requested));
    }

    #[test]
    fn candidate_urls_cover_five_orderings() {
        let issuer = Url::parse("https://auth.example.com/tenant").unwrap();
        let candidates = build_as_candidate_urls(&issuer);
        assert_eq!(candidates.len(), 5);
        assert!(candidates[0].as_str().contains("oauth-authorization-server"));
        assert!(candidates[0].as_str().contains("/tenant"));
        assert!(!candidates[3].as_str().contains("/tenant"));
    }

    #[test]
    fn authorization_server_metadata_roundtrips() {
        let json = r#"{
            "issuer": "https://auth.example.com",
            "authorization_endpoint": "https://auth.example.com/authorize",
            "token_endpoint": "https://auth.example.com/token",
            "response_types_supported": ["code"],
            "custom": "value"
        }"#;
        let meta: AuthorizationServerMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.issuer, "https://auth.example.com");
        assert_eq!(meta.extra["custom"], serde_json::json!("value"));
    }

    fn metadata_json(issuer: &str) -> serde_json::Value {
        serde_json::json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{issuer}/authorize"),
            "token_endpoint": format!("{issuer}/token"),
            "response_types_supported": ["code"],
        })
    }

    #[tokio::test]
    async fn candidate_with_mismatched_issuer_is_skipped_in_favor_of_a_matching_one() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let issuer = Url::parse(&format!("{}/tenant", server.uri())).unwrap();

        Mock::given(method("GET"))
            .and(path("/.well-known/oauth-authorization-server/tenant"))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json("https://attacker.example.com")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration/tenant"))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json(issuer.as_str())))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let meta = fetch_authorization_server_metadata(&client, &issuer).await.unwrap();
        assert_eq!(normalize(&meta.issuer), normalize(issuer.as_str()));
    }

    #[tokio::test]
    async fn mismatched_issuer_is_accepted_as_a_legacy_fallback_when_nothing_else_matches() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let issuer = Url::parse(&format!("{}/tenant", server.uri())).unwrap();

        Mock::given(method("GET"))
            .and(path("/.well-known/oauth-authorization-server/tenant"))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json("https://unexpected.example.com")))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let meta = fetch_authorization_server_metadata(&client, &issuer).await.unwrap();
        assert_eq!(meta.issuer, "https://unexpected.example.com");
    }

    #[tokio::test]
    async fn well_known_resource_metadata_must_cover_the_requested_resource() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let resource_url = Url::parse(&format!("{}/mcp", server.uri())).unwrap();

        Mock::given(method("GET"))
            .and(path("/.well-known/oauth-protected-resource/mcp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "resource": "https://unrelated.example.com/other",
                "authorization_servers": ["https://auth.example.com"],
            })))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_protected_resource_metadata(&client, &resource_url, None).await.unwrap_err();
        assert!(matches!(err, AuthError::DiscoveryFailed(_)));
    }

    #[tokio::test]
    async fn well_known_resource_metadata_is_accepted_when_it_covers_the_resource() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let resource_url = Url::parse(&format!("{}/mcp", server.uri())).unwrap();

        Mock::given(method("GET"))
            .and(path("/.well-known/oauth-protected-resource/mcp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "resource": resource_url.as_str(),
                "authorization_servers": ["https://auth.example.com"],
            })))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let meta = fetch_protected_resource_metadata(&client, &resource_url, None).await.unwrap();
        assert_eq!(meta.authorization_servers, vec!["https://auth.example.com".to_string()]);
    }
}
