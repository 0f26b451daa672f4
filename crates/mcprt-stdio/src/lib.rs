//! Client-side stdio transport: spawn an MCP server as a child process and
//! speak newline-delimited JSON-RPC over its stdin/stdout.

#![warn(missing_docs)]

mod config;
mod transport;

pub use config::StdioConfig;
pub use transport::StdioTransport;

#[cfg(test)]
mod tests {
    use super::*;
    use mcprt_transport::Transport;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn echoes_a_line_through_cat() {
        let transport = StdioTransport::new(StdioConfig::new("cat"));
        transport.connect().await.unwrap();

        let message = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
        transport.send(message.clone()).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(5), transport.recv())
            .await
            .expect("timed out waiting for echo")
            .unwrap()
            .expect("stream ended unexpectedly");
        assert_eq!(received, message);

        transport.close().await.unwrap();
        assert!(!transport.is_alive());
    }

    #[tokio::test]
    async fn connect_rejects_an_empty_command() {
        let transport = StdioTransport::new(StdioConfig::default());
        assert!(transport.connect().await.is_err());
    }
}
