//! The single-endpoint "streamable HTTP" transport (MCP protocol version
//! 2025-06-18): one URL takes both `POST` requests and an optional `GET`
//! for a server-push stream, and a `POST` response itself may come back as
//! either `application/json` or `text/event-stream`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use reqwest::{header, Client as HttpClient, StatusCode};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tracing::{debug, trace, warn};

use mcprt_transport::{Transport, TransportError, TransportKind, TransportResult};

use crate::config::HttpConfig;
use crate::sse::SseDecoder;

/// Transport for the single-endpoint streamable HTTP carrier.
#[derive(Debug)]
pub struct StreamableHttpTransport {
    config: HttpConfig,
    http: HttpClient,
    session_id: TokioMutex<Option<String>>,
    inbound_tx: mpsc::Sender<Value>,
    inbound_rx: TokioMutex<mpsc::Receiver<Value>>,
    push_task: TokioMutex<Option<tokio::task::JoinHandle<()>>>,
    connected: AtomicBool,
}

impl StreamableHttpTransport {
    /// Build a transport from `config`. No network activity happens until
    /// [`Transport::connect`] is called.
    pub fn new(config: HttpConfig) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client with only timeout/use-rustls-tls config cannot fail to build");
        Self {
            config,
            http,
            session_id: TokioMutex::new(None),
            inbound_tx,
            inbound_rx: TokioMutex::new(inbound_rx),
            push_task: TokioMutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// The complete `Authorization` header value (scheme included), supplied
    /// by the configured token provider.
    async fn auth_token(&self) -> Option<String> {
        self.config.token_provider.token().await
    }

    async fn build_headers(&self, accept: &'static str, bearer: Option<&str>) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(accept));
        if let Ok(v) = header::HeaderValue::from_str(&self.config.protocol_version) {
            headers.insert("MCP-Protocol-Version", v);
        }
        if let Some(session) = self.session_id.lock().await.as_ref()
            && let Ok(v) = header::HeaderValue::from_str(session)
        {
            headers.insert("Mcp-Session-Id", v);
        }
        if let Some(token) = bearer
            && let Ok(v) = header::HeaderValue::from_str(token)
        {
            headers.insert(header::AUTHORIZATION, v);
        }
        for (key, value) in &self.config.headers {
            if let (Ok(k), Ok(v)) =
                (header::HeaderName::from_bytes(key.as_bytes()), header::HeaderValue::from_str(value))
            {
                headers.insert(k, v);
            }
        }
        headers
    }

    async fn post_once(&self, body: &Value, bearer: Option<String>) -> TransportResult<reqwest::Response> {
        let headers = self.build_headers("application/json, text/event-stream", bearer.as_deref()).await;
        self.http
            .post(self.config.endpoint_url())
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))
    }

    async fn start_push_stream(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                if attempt > 0 {
                    match this.config.retry_policy.delay(attempt - 1) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => {
                            debug!("streamable http push stream giving up after {attempt} attempts");
                            break;
                        }
                    }
                }
                if !this.connected.load(Ordering::SeqCst) {
                    break;
                }

                let bearer = this.auth_token().await;
                let headers = this.build_headers("text/event-stream", bearer.as_deref()).await;
                let response = match this.http.get(this.config.endpoint_url()).headers(headers).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        trace!(error = %e, "streamable http push GET failed, retrying");
                        attempt += 1;
                        continue;
                    }
                };

                if response.status() == StatusCode::METHOD_NOT_ALLOWED {
                    debug!("server does not support server-push GET, disabling push stream");
                    break;
                }
                if !response.status().is_success() {
                    attempt += 1;
                    continue;
                }

                attempt = 0;
                let mut decoder = SseDecoder::new();
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(bytes) => {
                            for event in decoder.feed(&bytes) {
                                if event.data.trim().is_empty() {
                                    continue;
                                }
                                match serde_json::from_str::<Value>(&event.data) {
                                    Ok(value) => {
                                        if this.inbound_tx.send(value).await.is_err() {
                                            return;
                                        }
                                    }
                                    Err(e) => warn!(error = %e, "dropping malformed push event"),
                                }
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "streamable http push stream read error");
                            break;
                        }
                    }
                }
                attempt += 1;
            }
        });
        *self.push_task.lock().await = Some(handle);
    }

    async fn capture_session_id(&self, response: &reqwest::Response) {
        if let Some(sid) = response.headers().get("Mcp-Session-Id").and_then(|v| v.to_str().ok()) {
            *self.session_id.lock().await = Some(sid.to_string());
        }
    }
}

#[async_trait::async_trait]
impl Transport for StreamableHttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::StreamableHttp
    }

    async fn connect(&self) -> TransportResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, message: Value) -> TransportResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }

        let bearer = self.auth_token().await;
        let mut response = self.post_once(&message, bearer.clone()).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let refreshed = self.config.token_provider.refresh().await?;
            response = self.post_once(&message, Some(refreshed)).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(TransportError::Unauthorized(
                    "server rejected refreshed credentials".into(),
                ));
            }
        }

        if !response.status().is_success() {
            return Err(TransportError::ConnectionFailed(format!("POST failed: {}", response.status())));
        }

        self.capture_session_id(&response).await;

        if response.status() == StatusCode::ACCEPTED {
            return Ok(());
        }

        let content_type =
            response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("").to_string();

        if content_type.contains("application/json") {
            let bytes = response.bytes().await.map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            let value: Value = serde_json::from_slice(&bytes)?;
            self.inbound_tx.send(value).await.map_err(|_| TransportError::ConnectionLost("inbound channel closed".into()))?;
        } else if content_type.contains("text/event-stream") {
            let mut decoder = SseDecoder::new();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let bytes = chunk.map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
                for event in decoder.feed(&bytes) {
                    if event.data.trim().is_empty() {
                        continue;
                    }
                    let value: Value = serde_json::from_str(&event.data)?;
                    self.inbound_tx
                        .send(value)
                        .await
                        .map_err(|_| TransportError::ConnectionLost("inbound channel closed".into()))?;
                }
            }
        }

        Ok(())
    }

    async fn recv(&self) -> TransportResult<Option<Value>> {
        let mut guard = self.inbound_rx.lock().await;
        Ok(guard.recv().await)
    }

    async fn close(&self) -> TransportResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(handle) = self.push_task.lock().await.take() {
            handle.abort();
        }
        if let Some(session_id) = self.session_id.lock().await.take() {
            let mut headers = header::HeaderMap::new();
            if let Ok(v) = header::HeaderValue::from_str(&session_id) {
                headers.insert("Mcp-Session-Id", v);
            }
            let _ = self.http.delete(self.config.endpoint_url()).headers(headers).send().await;
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Start the optional background GET stream for server-initiated push
/// messages. Separate from `connect` because it needs an `Arc<Self>` to
/// hand the task a stable reference; callers typically do:
/// `let transport = Arc::new(StreamableHttpTransport::new(config)); transport.connect().await?; transport.enable_push().await;`
impl StreamableHttpTransport {
    /// Opt into the optional server-push GET stream. Safe to call even if
    /// the server doesn't support it — the background task detects a `405`
    /// and exits quietly.
    pub async fn enable_push(self: &Arc<Self>) {
        self.start_push_stream().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_delivers_a_json_response_to_recv() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_json(serde_json::json!({"jsonrpc":"2.0","id":1,"result":{}})),
            )
            .mount(&server)
            .await;

        let config = HttpConfig::new(server.uri());
        let transport = StreamableHttpTransport::new(config);
        transport.connect().await.unwrap();
        transport.send(serde_json::json!({"jsonrpc":"2.0","id":1,"method":"ping"})).await.unwrap();

        let received = transport.recv().await.unwrap().unwrap();
        assert_eq!(received["id"], 1);
    }

    #[tokio::test]
    async fn a_202_response_delivers_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/mcp")).respond_with(ResponseTemplate::new(202)).mount(&server).await;

        let config = HttpConfig::new(server.uri());
        let transport = StreamableHttpTransport::new(config);
        transport.connect().await.unwrap();
        transport
            .send(serde_json::json!({"jsonrpc":"2.0","method":"notifications/initialized"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn a_persistent_401_becomes_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/mcp")).respond_with(ResponseTemplate::new(401)).mount(&server).await;

        let config = HttpConfig::new(server.uri())
            .token_provider(Arc::new(crate::auth::StaticToken("expired".into())));
        let transport = StreamableHttpTransport::new(config);
        transport.connect().await.unwrap();
        let err = transport.send(serde_json::json!({"jsonrpc":"2.0","id":1,"method":"ping"})).await.unwrap_err();
        assert!(matches!(err, TransportError::Unauthorized(_)));
    }
}
