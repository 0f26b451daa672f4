//! Local loopback redirect listener and system-browser launch for the
//! authorization code flow.

use tiny_http::{Response, Server};
use tokio::sync::oneshot;

use crate::error::{AuthError, Result};

/// The `code`/`state` pair extracted from the redirect callback.
pub struct CallbackResult {
    /// The authorization code.
    pub code: String,
    /// The `state` value, to be checked against what was sent.
    pub state: String,
}

/// A bound loopback HTTP listener waiting for exactly one OAuth redirect.
pub struct CallbackListener {
    redirect_uri: String,
    rx: oneshot::Receiver<CallbackResult>,
}

impl CallbackListener {
    /// Binds `127.0.0.1:port` (`0` picks a free port) and starts a
    /// background task that serves the single expected `/callback` request.
    pub fn bind(port: u16) -> Result<Self> {
        let server = Server::http(format!("127.0.0.1:{port}")).map_err(|e| AuthError::CallbackListener(e.to_string()))?;
        let tiny_http::ListenAddr::IP(addr) = server.server_addr() else {
            return Err(AuthError::CallbackListener("unsupported listen address".into()));
        };
        let redirect_uri = format!("http://127.0.0.1:{}/callback", addr.port());

        let (tx, rx) = oneshot::channel();
        tokio::task::spawn_blocking(move || {
            while let Ok(request) = server.recv() {
                let url = request.url().to_string();
                match parse_callback(&url) {
                    Some(result) => {
                        let response = Response::from_string("Authorization complete. You may close this tab.");
                        let _ = request.respond(response);
                        let _ = tx.send(result);
                        break;
                    }
                    None => {
                        let response = Response::from_string("Invalid OAuth callback").with_status_code(400);
                        let _ = request.respond(response);
                    }
                }
            }
        });

        Ok(Self { redirect_uri, rx })
    }

    /// The `redirect_uri` this listener answers on.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Waits (bounded by `timeout`) for the redirect callback.
    pub async fn wait(self, timeout: std::time::Duration) -> Result<CallbackResult> {
        tokio::time::timeout(timeout, self.rx).await.map_err(|_| AuthError::CallbackTimeout)?.map_err(|_| AuthError::CallbackTimeout)
    }
}

fn parse_callback(url: &str) -> Option<CallbackResult> {
    let (route, query) = url.split_once('?')?;
    if route != "/callback" {
        return None;
    }
    let mut code = None;
    let mut state = None;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=')?;
        let value = urlencoding_decode(value);
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            _ => {}
        }
    }
    Some(CallbackResult { code: code?, state: state? })
}

fn urlencoding_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3])
                    && let Ok(byte) = u8::from_str_radix(hex, 16)
                {
                    out.push(byte as char);
                    i += 3;
                    continue;
                }
                out.push('%');
                i += 1;
            }
            b => {
                out.push(b as char);
                i += 1;
            }
        }
    }
    out
}

/// Opens `url` in the user's default browser. Failures are non-fatal; the
/// caller is expected to also print the URL for manual use.
pub fn open(url: &str) -> bool {
    webbrowser::open(url).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_code_and_state() {
        let result = parse_callback("/callback?code=abc&state=xyz").unwrap();
        assert_eq!(result.code, "abc");
        assert_eq!(result.state, "xyz");
    }

    #[test]
    fn rejects_wrong_path() {
        assert!(parse_callback("/other?code=abc&state=xyz").is_none());
    }

    #[test]
    fn rejects_missing_state() {
        assert!(parse_callback("/callback?code=abc").is_none());
    }

    #[test]
    fn decodes_percent_and_plus() {
        assert_eq!(urlencoding_decode("hello+world"), "hello world");
        assert_eq!(urlencoding_decode("a%20b"), "a b");
    }
}
