//! RFC 8707 resource indicator validation.

use url::Url;

use crate::error::{AuthError, Result};

/// Validates and normalizes a `resource` parameter per RFC 8707 section 2:
/// must be an absolute URI, `https` (or `http` for loopback addresses used
/// in local development), with no fragment, host present, scheme and host
/// lowercased.
pub fn validate_resource_uri(uri: &str) -> Result<String> {
    let mut url = Url::parse(uri).map_err(|_| AuthError::InvalidResource(uri.to_string()))?;

    let host = url.host_str().ok_or_else(|| AuthError::InvalidResource(format!("{uri} has no host")))?;
    let is_loopback = matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0" | "::1");

    match url.scheme() {
        "https" => {}
        "http" if is_loopback => {}
        other => {
            return Err(AuthError::InvalidResource(format!(
                "{uri} uses scheme {other}, only https (or http for loopback) is allowed"
            )));
        }
    }

    if url.fragment().is_some() {
        return Err(AuthError::InvalidResource(format!("{uri} must not contain a fragment")));
    }

    let lowercase_scheme = url.scheme().to_ascii_lowercase();
    url.set_scheme(&lowercase_scheme).ok();
    let lowercase_host = host.to_ascii_lowercase();
    url.set_host(Some(&lowercase_host)).map_err(|_| AuthError::InvalidResource(uri.to_string()))?;

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_resource() {
        assert!(validate_resource_uri("https://api.example.com/mcp").is_ok());
    }

    #[test]
    fn accepts_http_for_localhost() {
        assert!(validate_resource_uri("http://localhost:8080/mcp").is_ok());
        assert!(validate_resource_uri("http://127.0.0.1:8080/mcp").is_ok());
    }

    #[test]
    fn rejects_http_for_non_loopback() {
        assert!(validate_resource_uri("http://api.example.com/mcp").is_err());
    }

    #[test]
    fn rejects_fragment() {
        assert!(validate_resource_uri("https://api.example.com/mcp#section").is_err());
    }

    #[test]
    fn lowercases_scheme_and_host() {
        let normalized = validate_resource_uri("HTTPS://API.Example.COM/mcp").unwrap();
        assert!(normalized.starts_with("https://api.example.com"));
    }

    #[test]
    fn rejects_unparseable_uri() {
        assert!(validate_resource_uri("not a url").is_err());
    }
}
