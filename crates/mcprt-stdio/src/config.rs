//! Configuration for [`crate::StdioTransport`].

use std::time::Duration;

/// How to spawn and manage the child process an MCP server runs as.
#[derive(Debug, Clone)]
pub struct StdioConfig {
    /// Executable to run.
    pub command: String,
    /// Arguments passed to `command`.
    pub args: Vec<String>,
    /// Working directory for the child, or the parent's if `None`.
    pub working_directory: Option<String>,
    /// Extra environment variables merged into the child's environment.
    /// The child otherwise inherits the parent's environment untouched.
    pub environment: Vec<(String, String)>,
    /// How long to wait for the process to spawn and stay alive before
    /// `connect` gives up.
    pub startup_timeout: Duration,
    /// How long to wait after SIGTERM (or `start_kill` on non-Unix) before
    /// escalating to SIGKILL.
    pub shutdown_timeout: Duration,
    /// Inbound lines longer than this are logged and dropped rather than
    /// delivered, so one misbehaving server cannot force an unbounded
    /// allocation.
    pub max_message_size: usize,
}

impl Default for StdioConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            working_directory: None,
            environment: Vec::new(),
            startup_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(10),
            max_message_size: 10 * 1024 * 1024,
        }
    }
}

impl StdioConfig {
    /// Start building a config for the given executable.
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), ..Self::default() }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Add one environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.push((key.into(), value.into()));
        self
    }
}
