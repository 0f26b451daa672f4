//! The legacy HTTP+SSE transport (MCP protocol versions up to 2025-03-26):
//! a long-lived `GET` opens the event stream and its first event names the
//! separate `POST` endpoint to send requests to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{header, Client as HttpClient};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex as TokioMutex, RwLock};
use tracing::{debug, info, warn};

use mcprt_transport::{Transport, TransportError, TransportKind, TransportResult};

use crate::config::HttpConfig;
use crate::sse::SseDecoder;

struct Inner {
    config: HttpConfig,
    http: HttpClient,
    message_endpoint: RwLock<Option<String>>,
    inbound_tx: mpsc::Sender<Value>,
    inbound_rx: TokioMutex<mpsc::Receiver<Value>>,
    stream_task: TokioMutex<Option<tokio::task::JoinHandle<()>>>,
    connected: AtomicBool,
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner").field("config", &self.config).finish_non_exhaustive()
    }
}

/// Transport for the legacy two-endpoint SSE carrier.
///
/// Holds its state behind an `Arc` internally so that `connect` can hand a
/// stable, shared reference to the background reconnect task without
/// requiring callers to wrap the transport in an `Arc` themselves.
#[derive(Debug)]
pub struct SseTransport {
    inner: Arc<Inner>,
}

impl SseTransport {
    /// Build a transport from `config`. No network activity happens until
    /// [`Transport::connect`] is called.
    pub fn new(config: HttpConfig) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client with only timeout config cannot fail to build");
        Self {
            inner: Arc::new(Inner {
                config,
                http,
                message_endpoint: RwLock::new(None),
                inbound_tx,
                inbound_rx: TokioMutex::new(inbound_rx),
                stream_task: TokioMutex::new(None),
                connected: AtomicBool::new(false),
            }),
        }
    }
}

impl Inner {
    fn resolve_message_url(&self, discovered: Option<&str>) -> String {
        match discovered {
            Some(endpoint) if endpoint.starts_with("http://") || endpoint.starts_with("https://") => {
                endpoint.to_string()
            }
            Some(endpoint) if endpoint.starts_with('/') => format!("{}{endpoint}", self.config.base_url),
            Some(endpoint) => format!("{}/{endpoint}", self.config.base_url),
            None => self.config.endpoint_url(),
        }
    }

    async fn stream_loop(self: Arc<Self>) {
        let mut attempt = 0u32;
        loop {
            if attempt > 0 {
                match self.config.retry_policy.delay(attempt - 1) {
                    Some(delay) => tokio::time::sleep(delay).await,
                    None => {
                        warn!("sse transport giving up after {attempt} reconnect attempts");
                        self.connected.store(false, Ordering::SeqCst);
                        return;
                    }
                }
            }
            if !self.connected.load(Ordering::SeqCst) {
                return;
            }

            let mut headers = header::HeaderMap::new();
            headers.insert(header::ACCEPT, header::HeaderValue::from_static("text/event-stream"));
            if let Ok(v) = header::HeaderValue::from_str(&self.config.protocol_version) {
                headers.insert("MCP-Protocol-Version", v);
            }
            if let Some(token) = self.config.token_provider.token().await
                && let Ok(v) = header::HeaderValue::from_str(&token)
            {
                headers.insert(header::AUTHORIZATION, v);
            }

            let response = match self.http.get(self.config.endpoint_url()).headers(headers).send().await {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    warn!(status = %r.status(), "sse connect failed");
                    attempt += 1;
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "sse connect failed");
                    attempt += 1;
                    continue;
                }
            };

            info!("sse stream established");
            attempt = 0;

            let mut decoder = SseDecoder::new();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        for event in decoder.feed(&bytes) {
                            if self.handle_event(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "sse stream read error");
                        break;
                    }
                }
            }

            debug!("sse stream ended");
            attempt += 1;
        }
    }

    async fn handle_event(&self, event: crate::sse::SseEvent) -> Result<(), ()> {
        match event.event.as_deref() {
            Some("endpoint") => {
                let uri = extract_endpoint_uri(&event.data);
                info!(%uri, "discovered message endpoint");
                *self.message_endpoint.write().await = Some(uri);
                Ok(())
            }
            Some("message") | None => {
                if event.data.trim().is_empty() {
                    return Ok(());
                }
                match serde_json::from_str::<Value>(&event.data) {
                    Ok(value) => self.inbound_tx.send(value).await.map_err(|_| ()),
                    Err(e) => {
                        warn!(error = %e, "dropping malformed sse message event");
                        Ok(())
                    }
                }
            }
            Some(other) => {
                debug!(event = other, "ignoring unrecognized sse event type");
                Ok(())
            }
        }
    }
}

fn extract_endpoint_uri(data: &str) -> String {
    let trimmed = data.trim();
    if trimmed.starts_with('{')
        && let Ok(value) = serde_json::from_str::<Value>(trimmed)
        && let Some(uri) = value.get("uri").and_then(Value::as_str)
    {
        return uri.to_string();
    }
    trimmed.to_string()
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Sse
    }

    async fn connect(&self) -> TransportResult<()> {
        self.inner.connected.store(true, Ordering::SeqCst);
        let task_inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(task_inner.stream_loop());
        *self.inner.stream_task.lock().await = Some(handle);
        // Give the stream a brief window to deliver the endpoint-discovery
        // event before the caller starts sending.
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    }

    async fn send(&self, message: Value) -> TransportResult<()> {
        let inner = &self.inner;
        if !inner.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }

        let discovered = inner.message_endpoint.read().await.clone();
        let url = inner.resolve_message_url(discovered.as_deref());

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Ok(v) = header::HeaderValue::from_str(&inner.config.protocol_version) {
            headers.insert("MCP-Protocol-Version", v);
        }
        if let Some(token) = inner.config.token_provider.token().await
            && let Ok(v) = header::HeaderValue::from_str(&token)
        {
            headers.insert(header::AUTHORIZATION, v);
        }

        let response = inner
            .http
            .post(url)
            .headers(headers)
            .json(&message)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TransportError::Unauthorized("server rejected request".into()));
        }
        if !response.status().is_success() {
            return Err(TransportError::SendFailed(format!("POST failed: {}", response.status())));
        }
        // Replies arrive asynchronously over the SSE stream, not in this
        // response body, per the legacy HTTP+SSE transport's design.
        Ok(())
    }

    async fn recv(&self) -> TransportResult<Option<Value>> {
        let mut guard = self.inner.inbound_rx.lock().await;
        Ok(guard.recv().await)
    }

    async fn close(&self) -> TransportResult<()> {
        self.inner.connected.store(false, Ordering::SeqCst);
        if let Some(handle) = self.inner.stream_task.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_uri_from_json_endpoint_event() {
        assert_eq!(extract_endpoint_uri(r#"{"uri":"/mcp/messages"}"#), "/mcp/messages");
    }

    #[test]
    fn accepts_a_plain_string_endpoint_event() {
        assert_eq!(extract_endpoint_uri("/mcp/messages"), "/mcp/messages");
    }
}
