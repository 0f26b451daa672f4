//! Canonical form for server URLs used as storage keys and compared during
//! discovery's issuer/resource checks.

use url::Url;

/// Normalizes a URL to a canonical form: lowercased scheme and host (done by
/// `Url::parse` itself per the WHATWG URL Standard), the default port for
/// `http`/`https` removed, and exactly one trailing slash stripped.
///
/// Two URLs that should refer to the same server collide to the same
/// normalized string, e.g. `"HTTPS://H:443/a/"` and `"https://h/a"` both
/// normalize to `"https://h/a"`. Idempotent: `normalize(normalize(u)) ==
/// normalize(u)`. URLs that fail to parse are returned unchanged.
pub fn normalize(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let default_port = match parsed.scheme() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    if parsed.port() == default_port {
        let _ = parsed.set_port(None);
    }

    let mut rendered = parsed.to_string();
    if rendered.ends_with('/') {
        rendered.pop();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_scheme_and_host_and_strips_default_port_and_trailing_slash() {
        assert_eq!(normalize("HTTPS://H:443/a/"), "https://h/a");
    }

    #[test]
    fn keeps_a_non_default_port() {
        assert_eq!(normalize("https://h:8443/a"), "https://h:8443/a");
    }

    #[test]
    fn strips_default_http_port() {
        assert_eq!(normalize("http://h:80/a"), "http://h/a");
    }

    #[test]
    fn is_idempotent() {
        let once = normalize("HTTPS://Example.COM:443/foo/");
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn bare_origin_loses_its_trailing_slash() {
        assert_eq!(normalize("https://Example.com/"), "https://example.com");
    }

    #[test]
    fn unparseable_input_is_returned_unchanged() {
        assert_eq!(normalize("not a url"), "not a url");
    }
}
