//! `ControlPlane` implementation on top of `tokio::process`

use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;

use crate::control::{
    BusEvent, ControlPlane, EventBus, ExecuteOutcome, ExecuteRequest, KillRequest, SpawnRequest,
    StatusRequest,
};
use crate::error::{BridgeError, Result};
use crate::types::agent::AgentStatus;
use crate::types::identifiers::ProcessId;
use crate::types::process::{AgentType, ManagedProcess, ProcessStatusReport};

use super::command::{CommandBuilder, find_binary, resolve_program};
use super::config::{DEFAULT_KILL_GRACE, LaunchCommand, VERSION_PROBE_TIMEOUT};
use super::lifecycle::ChildEntry;
use super::reader::{pump_stderr, pump_stdout};

/// Control plane that runs agents as local subprocesses
///
/// `execute` runs one agent invocation and streams its output onto the
/// event bus. Long-lived workspace processes are started from launch
/// commands registered with [`with_launch_command`](Self::with_launch_command).
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use agent_bridge::{AgentContext, EventBus, LocalControlPlane};
///
/// let bus = EventBus::new();
/// let control = Arc::new(LocalControlPlane::new(bus.clone()));
/// let ctx = AgentContext::new(control, bus);
/// ```
pub struct LocalControlPlane {
    bus: EventBus,
    launch_commands: HashMap<AgentType, LaunchCommand>,
    pub(super) children: Mutex<HashMap<ProcessId, ChildEntry>>,
    pub(super) kill_grace: Duration,
}

impl LocalControlPlane {
    /// Create a control plane publishing onto `bus`
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            launch_commands: HashMap::new(),
            children: Mutex::new(HashMap::new()),
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    /// Register the command that starts a long-lived process for an agent
    #[must_use]
    pub fn with_launch_command(mut self, agent_type: AgentType, command: LaunchCommand) -> Self {
        self.launch_commands.insert(agent_type, command);
        self
    }

    /// How long a killed process may take to exit before it is force-killed
    #[must_use]
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// Bus this control plane publishes onto
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Number of long-lived processes currently tracked
    #[must_use]
    pub fn tracked_processes(&self) -> usize {
        self.children.lock().len()
    }

    pub(super) fn launch_command(&self, agent_type: AgentType) -> Option<&LaunchCommand> {
        self.launch_commands.get(&agent_type)
    }

    async fn execute_impl(&self, request: ExecuteRequest) -> Result<ExecuteOutcome> {
        let session_id = request.session_id.clone();
        let program = resolve_program(&request.program)?;
        let builder = CommandBuilder::new(&program, &request.args, &request.env)
            .cwd(request.working_directory.as_deref())
            .pipe_stdin(request.stdin.is_some());

        log::debug!(
            "[{session_id}] running {} {}",
            program.display(),
            request.args.len()
        );
        let mut child = match builder.build().spawn() {
            Ok(child) => child,
            Err(e) => {
                let message = builder.spawn_error(&e);
                log::error!("[{session_id}] {message}");
                self.bus.publish(BusEvent::error(session_id, message.clone()));
                return Err(BridgeError::process(message, None, None));
            }
        };

        if let (Some(input), Some(mut stdin)) = (request.stdin.as_deref(), child.stdin.take()) {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::control_plane("Failed to get stdout handle"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BridgeError::control_plane("Failed to get stderr handle"))?;

        let ((), captured) = tokio::join!(
            pump_stdout(stdout, &self.bus, &session_id),
            pump_stderr(stderr, &self.bus, &session_id),
        );
        let status = child.wait().await?;
        self.bus.publish(BusEvent::done(session_id.clone()));

        log::debug!("[{session_id}] exited with {status}");
        let stderr = if captured.trim().is_empty() {
            None
        } else {
            Some(captured)
        };
        Ok(ExecuteOutcome {
            success: status.success(),
            exit_code: status.code(),
            stderr,
        })
    }

    async fn check_agent_impl(&self, agent_type: AgentType) -> Result<AgentStatus> {
        let binary = agent_type.binary();
        let path = match find_binary(binary) {
            Ok(path) => path,
            Err(e) => return Ok(AgentStatus::not_installed(agent_type, e.to_string())),
        };

        let probe = tokio::process::Command::new(&path)
            .arg("--version")
            .kill_on_drop(true)
            .output();
        let version = match tokio::time::timeout(VERSION_PROBE_TIMEOUT, probe).await {
            Ok(Ok(output)) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
            Ok(Ok(_)) | Ok(Err(_)) => None,
            Err(_) => {
                log::warn!("{binary} --version did not answer in time");
                None
            }
        };

        Ok(AgentStatus {
            agent_type,
            installed: true,
            authenticated: None,
            version,
            binary_path: Some(path),
            error: None,
        })
    }
}

impl ControlPlane for LocalControlPlane {
    fn spawn(&self, request: SpawnRequest) -> BoxFuture<'_, Result<ManagedProcess>> {
        Box::pin(self.spawn_impl(request))
    }

    fn kill(&self, request: KillRequest) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.kill_impl(request))
    }

    fn status(&self, request: StatusRequest) -> BoxFuture<'_, Result<ProcessStatusReport>> {
        Box::pin(async move { self.status_impl(&request) })
    }

    fn check_agent(&self, agent_type: AgentType) -> BoxFuture<'_, Result<AgentStatus>> {
        Box::pin(self.check_agent_impl(agent_type))
    }

    fn execute(&self, request: ExecuteRequest) -> BoxFuture<'_, Result<ExecuteOutcome>> {
        Box::pin(self.execute_impl(request))
    }
}

impl Drop for LocalControlPlane {
    fn drop(&mut self) {
        self.kill_all();
    }
}
