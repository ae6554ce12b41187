//! Error types for the agent bridge

use thiserror::Error;

/// Main error type for the agent bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Agent CLI binary not found or not installed
    #[error("Agent CLI not found: {0}")]
    CliNotFound(String),

    /// Concurrency ceiling reached when spawning a workspace process
    #[error("Maximum concurrent agent processes reached (limit: {limit})")]
    CapacityExceeded {
        /// Effective limit that was hit
        limit: usize,
    },

    /// A control-plane call or a session did not finish in time
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The subprocess control plane rejected or failed a request
    #[error("Control plane error: {0}")]
    ControlPlane(String),

    /// Event bus delivery failed
    #[error("Event bus error: {0}")]
    EventBus(String),

    /// Subprocess exited with a failure status
    #[error("Process error (exit code {}): {message}{}", fmt_exit_code(.exit_code), fmt_stderr(.stderr))]
    Process {
        /// Error message
        message: String,
        /// Process exit code, if the process reported one
        exit_code: Option<i32>,
        /// Captured standard error output
        stderr: Option<String>,
    },

    /// The agent reported an explicit error payload on its stream
    #[error("Agent error: {0}")]
    Agent(String),

    /// Agent id is not present in the registry
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// No process is cached for the workspace
    #[error("No agent process for workspace: {0}")]
    ProcessNotFound(String),

    /// Cached process is not eligible for restart
    #[error("Agent process for workspace {0} cannot be restarted")]
    RestartNotAllowed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn fmt_exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

fn fmt_stderr(stderr: &Option<String>) -> String {
    match stderr.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => format!(": {text}"),
        _ => String::new(),
    }
}

/// Result type alias for agent bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Create a CLI not found error for the given binary
    pub fn cli_not_found(binary: &str) -> Self {
        Self::CliNotFound(format!(
            "`{binary}` was not found on PATH or in the usual install locations"
        ))
    }

    /// Create a capacity error naming the effective limit
    #[must_use]
    pub fn capacity_exceeded(limit: usize) -> Self {
        Self::CapacityExceeded { limit }
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a control plane error
    pub fn control_plane(msg: impl Into<String>) -> Self {
        Self::ControlPlane(msg.into())
    }

    /// Create an event bus error
    pub fn event_bus(msg: impl Into<String>) -> Self {
        Self::EventBus(msg.into())
    }

    /// Create a process error
    pub fn process(msg: impl Into<String>, exit_code: Option<i32>, stderr: Option<String>) -> Self {
        Self::Process {
            message: msg.into(),
            exit_code,
            stderr,
        }
    }

    /// Create an agent error
    pub fn agent(msg: impl Into<String>) -> Self {
        Self::Agent(msg.into())
    }

    /// Create an unknown agent error
    pub fn unknown_agent(id: impl Into<String>) -> Self {
        Self::UnknownAgent(id.into())
    }

    /// Create a process not found error
    pub fn process_not_found(workspace_id: impl Into<String>) -> Self {
        Self::ProcessNotFound(workspace_id.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether the failure is transient I/O that is worth retrying
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::ControlPlane(_) | Self::EventBus(_) | Self::Io(_)
        )
    }

    /// Captured stderr, for subprocess failures
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Process { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}
