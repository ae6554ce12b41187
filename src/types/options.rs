//! Manager configuration and per-send options
//!
//! This module contains the process manager configuration (soft concurrency
//! limit and spawn timeout) and the options accepted by adapter sends,
//! including a builder pattern for each.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{BridgeError, Result};

// ============================================================================
// Manager Configuration
// ============================================================================

/// Absolute ceiling on concurrently cached agent processes
///
/// Configuration can lower the effective limit, never raise it past this.
pub const HARD_PROCESS_CEILING: usize = 5;

/// Default soft limit on concurrently cached agent processes
pub const DEFAULT_MAX_PROCESSES: usize = 3;

/// Default guard on a control-plane spawn call
pub const DEFAULT_SPAWN_TIMEOUT: Duration = Duration::from_secs(15);

const MAX_PROCESSES_ENV: &str = "AGENT_BRIDGE_MAX_PROCESSES";
const SPAWN_TIMEOUT_ENV: &str = "AGENT_BRIDGE_SPAWN_TIMEOUT_MS";

/// Configuration for the [`ProcessManager`](crate::ProcessManager)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Soft limit on cached processes
    pub max_processes: usize,
    /// How long a control-plane spawn may stall before it is rejected
    pub spawn_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_processes: DEFAULT_MAX_PROCESSES,
            spawn_timeout: DEFAULT_SPAWN_TIMEOUT,
        }
    }
}

impl ManagerConfig {
    /// Create a new builder for `ManagerConfig`
    #[must_use]
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }

    /// Load configuration from `AGENT_BRIDGE_*` environment variables
    ///
    /// Unset variables fall back to the defaults.
    ///
    /// # Errors
    /// Returns `BridgeError::InvalidConfig` if a variable is set but not a
    /// positive integer
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = read_positive_env(MAX_PROCESSES_ENV)? {
            config.max_processes = usize::try_from(value).map_err(|_| {
                BridgeError::invalid_config(format!("{MAX_PROCESSES_ENV} is out of range"))
            })?;
        }
        if let Some(value) = read_positive_env(SPAWN_TIMEOUT_ENV)? {
            config.spawn_timeout = Duration::from_millis(value);
        }

        Ok(config)
    }

    /// Limit actually enforced: the soft limit clamped to the hard ceiling
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.max_processes.min(HARD_PROCESS_CEILING)
    }
}

fn read_positive_env(name: &str) -> Result<Option<u64>> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(BridgeError::invalid_config(format!(
            "{name} must be a positive integer, got {raw:?}"
        ))),
    }
}

/// Builder for `ManagerConfig`
#[derive(Debug, Default)]
pub struct ManagerConfigBuilder {
    config: ManagerConfig,
}

impl ManagerConfigBuilder {
    /// Set the soft limit on cached processes
    #[must_use]
    pub const fn max_processes(mut self, max: usize) -> Self {
        self.config.max_processes = max;
        self
    }

    /// Set the spawn timeout
    #[must_use]
    pub const fn spawn_timeout(mut self, timeout: Duration) -> Self {
        self.config.spawn_timeout = timeout;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> ManagerConfig {
        self.config
    }
}

// ============================================================================
// Stop Handle
// ============================================================================

/// Cooperative stop flag for an in-flight send
///
/// Stopping does not kill the subprocess; it only stops further output from
/// being surfaced and makes the send resolve with the partial text.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    /// Create a fresh, unstopped handle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Whether a stop was requested
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once a stop is requested
    pub async fn stopped(&self) {
        self.token.cancelled().await;
    }
}

// ============================================================================
// Send Options
// ============================================================================

/// Options for one adapter send
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Model to ask the agent for
    pub model: Option<String>,
    /// Working directory for the agent process
    pub working_directory: Option<PathBuf>,
    /// Extra environment variables for the agent process
    pub env: HashMap<String, String>,
    /// Extra CLI arguments appended after the adapter's own
    pub extra_args: Vec<String>,
    /// Upper bound on the whole exchange
    pub timeout: Option<Duration>,
    /// Cooperative stop flag
    pub stop: Option<StopHandle>,
}

impl SendOptions {
    /// Create a new builder for `SendOptions`
    #[must_use]
    pub fn builder() -> SendOptionsBuilder {
        SendOptionsBuilder::default()
    }

    /// Whether the caller has requested a stop
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.as_ref().is_some_and(StopHandle::is_stopped)
    }
}

/// Builder for `SendOptions`
#[derive(Debug, Default)]
pub struct SendOptionsBuilder {
    options: SendOptions,
}

impl SendOptionsBuilder {
    /// Set the model
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = Some(model.into());
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.working_directory = Some(path.into());
        self
    }

    /// Add an environment variable
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.env.insert(key.into(), value.into());
        self
    }

    /// Append an extra CLI argument
    #[must_use]
    pub fn extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.options.extra_args.push(arg.into());
        self
    }

    /// Bound the whole exchange
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Attach a stop handle
    #[must_use]
    pub fn stop_handle(mut self, stop: StopHandle) -> Self {
        self.options.stop = Some(stop);
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> SendOptions {
        self.options
    }
}
