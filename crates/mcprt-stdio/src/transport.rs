//! A [`Transport`] that spawns an MCP server as a child process and speaks
//! newline-delimited JSON over its stdin/stdout.
//!
//! Grounded on the hybrid mutex pattern used throughout this runtime's
//! teacher transport crate: state that never crosses an `.await` lives
//! behind `std::sync::Mutex`; the child handle and the stdio channels, which
//! are touched from inside async functions, live behind `tokio::sync::Mutex`.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use mcprt_core::jsonrpc;
use mcprt_transport::{Transport, TransportError, TransportKind, TransportResult};

use crate::config::StdioConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Disconnected,
    Connected,
    Closed,
}

/// Client-side stdio transport.
///
/// `connect` spawns the process once; there is no auto-restart on a dead
/// child or on stdout EOF — a closed transport stays closed, and the owning
/// session observes that through `recv` returning `Ok(None)` or `is_alive`
/// turning false.
#[derive(Debug)]
pub struct StdioTransport {
    config: StdioConfig,
    child: Arc<TokioMutex<Option<Child>>>,
    state: Arc<StdMutex<State>>,
    alive: Arc<AtomicBool>,
    stdin_tx: Arc<TokioMutex<Option<mpsc::Sender<String>>>>,
    stdout_rx: Arc<TokioMutex<Option<mpsc::Receiver<Value>>>>,
}

impl StdioTransport {
    /// Build a transport from `config`. Nothing happens until [`connect`]
    /// is called.
    ///
    /// [`connect`]: Transport::connect
    pub fn new(config: StdioConfig) -> Self {
        Self {
            config,
            child: Arc::new(TokioMutex::new(None)),
            state: Arc::new(StdMutex::new(State::Disconnected)),
            alive: Arc::new(AtomicBool::new(false)),
            stdin_tx: Arc::new(TokioMutex::new(None)),
            stdout_rx: Arc::new(TokioMutex::new(None)),
        }
    }

    async fn spawn_process(&self) -> TransportResult<()> {
        if self.config.command.is_empty() {
            return Err(TransportError::ConfigurationError("command must not be empty".into()));
        }

        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.config.working_directory {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.config.environment {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| TransportError::ConnectionFailed(format!("failed to spawn {}: {e}", self.config.command)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::ConnectionFailed("child stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::ConnectionFailed("child stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TransportError::ConnectionFailed("child stderr unavailable".into()))?;

        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(64);
        let (stdout_tx, stdout_rx) = mpsc::channel::<Value>(64);

        tokio::spawn(async move {
            let mut writer = BufWriter::new(stdin);
            while let Some(line) = stdin_rx.recv().await {
                if writer.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if writer.write_all(b"\n").await.is_err() || writer.flush().await.is_err() {
                    break;
                }
                trace!(bytes = line.len(), "wrote message to child stdin");
            }
            debug!("stdio writer task exiting");
        });

        let max_size = self.config.max_message_size;
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.len() > max_size {
                            warn!(bytes = line.len(), "dropping oversized message from server");
                            continue;
                        }
                        match jsonrpc::decode(line.as_bytes()) {
                            Ok(value) => {
                                if stdout_tx.send(value).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!(error = %e, "dropping malformed line from server stdout"),
                        }
                    }
                    Ok(None) => {
                        debug!("server stdout closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "error reading server stdout");
                        break;
                    }
                }
            }
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            // Per the MCP spec, stderr is diagnostic only and never a
            // protocol error.
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "mcprt_stdio::child_stderr", "{line}");
            }
        });

        *self.stdin_tx.lock().await = Some(stdin_tx);
        *self.stdout_rx.lock().await = Some(stdout_rx);
        *self.child.lock().await = Some(child);

        Ok(())
    }

    async fn terminate(&self) -> TransportResult<()> {
        *self.stdin_tx.lock().await = None;

        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };

        send_sigterm(&child);

        match timeout(self.config.shutdown_timeout, child.wait()).await {
            Ok(Ok(status)) => debug!(?status, "child process exited after sigterm"),
            Ok(Err(e)) => warn!(error = %e, "error waiting for child exit"),
            Err(_) => {
                warn!("shutdown timeout elapsed, sending sigkill");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to sigkill child process");
                }
            }
        }

        Ok(())
    }
}

#[cfg(unix)]
fn send_sigterm(child: &Child) {
    if let Some(pid) = child.id() {
        // SAFETY: `pid` came from `Child::id`, which is a live process id
        // for as long as this `Child` has not been waited on.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn send_sigterm(child: &Child) {
    let _ = child;
}

#[async_trait]
impl Transport for StdioTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    async fn connect(&self) -> TransportResult<()> {
        {
            let state = *self.state.lock().expect("state mutex poisoned");
            if state == State::Connected {
                return Ok(());
            }
            if state == State::Closed {
                return Err(TransportError::NotConnected);
            }
        }

        match timeout(self.config.startup_timeout, self.spawn_process()).await {
            Ok(Ok(())) => {
                *self.state.lock().expect("state mutex poisoned") = State::Connected;
                self.alive.store(true, Ordering::SeqCst);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn send(&self, message: Value) -> TransportResult<()> {
        let guard = self.stdin_tx.lock().await;
        let Some(tx) = guard.as_ref() else {
            return Err(TransportError::NotConnected);
        };
        let line = serde_json::to_string(&message)?;
        tx.send(line).await.map_err(|_| TransportError::ConnectionLost("stdin writer task exited".into()))
    }

    async fn recv(&self) -> TransportResult<Option<Value>> {
        let mut guard = self.stdout_rx.lock().await;
        let Some(rx) = guard.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        match rx.recv().await {
            Some(value) => Ok(Some(value)),
            None => {
                self.alive.store(false, Ordering::SeqCst);
                Ok(None)
            }
        }
    }

    async fn close(&self) -> TransportResult<()> {
        self.alive.store(false, Ordering::SeqCst);
        let already_closed = {
            let mut state = self.state.lock().expect("state mutex poisoned");
            let was_closed = *state == State::Closed;
            *state = State::Closed;
            was_closed
        };
        if already_closed {
            return Ok(());
        }
        self.terminate().await
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
