//! Shared test fixtures: an in-memory control plane that replays scripted
//! output onto the event bus.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use agent_bridge::{
    AgentContext, AgentStatus, AgentType, BridgeError, BusEvent, ControlPlane, EventBus,
    ExecuteOutcome, ExecuteRequest, KillRequest, ManagedProcess, ProcessId, ProcessStatus,
    ProcessStatusReport, Result, SpawnRequest, StatusRequest,
};
use chrono::Utc;
use futures::future::BoxFuture;
use parking_lot::Mutex;

/// Install the test logger once per binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// How the mock answers `spawn`
#[derive(Debug, Clone)]
pub enum SpawnMode {
    /// Resolve after one scheduler yield
    Immediate,
    /// Never resolve
    Never,
    /// Fail with a control-plane error
    Fail(String),
}

/// Output replayed by `execute`
#[derive(Debug, Clone)]
pub struct Script {
    /// Stdout chunks, published verbatim as `Line` records
    pub chunks: Vec<String>,
    /// Stderr chunks, published before stdout
    pub stderr: Vec<String>,
    /// Transport failure published after stdout
    pub bus_error: Option<String>,
    /// Value `execute` resolves with
    pub outcome: ExecuteOutcome,
    /// Publish output, then never resolve
    pub hold_open: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            chunks: Vec::new(),
            stderr: Vec::new(),
            bus_error: None,
            outcome: ExecuteOutcome::success(),
            hold_open: false,
        }
    }
}

impl Script {
    /// Script that prints each line followed by a newline
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: lines
                .into_iter()
                .map(|line| format!("{}\n", line.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Script that prints raw chunks with no added framing
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_stderr(mut self, chunk: impl Into<String>) -> Self {
        self.stderr.push(chunk.into());
        self
    }

    pub fn with_outcome(mut self, outcome: ExecuteOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_bus_error(mut self, message: impl Into<String>) -> Self {
        self.bus_error = Some(message.into());
        self
    }

    pub fn held_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

/// In-memory control plane
pub struct MockControlPlane {
    bus: EventBus,
    pub spawn_calls: AtomicUsize,
    pub kill_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    spawn_mode: Mutex<SpawnMode>,
    kill_fails: AtomicBool,
    status_failures: AtomicUsize,
    status_report: Mutex<ProcessStatusReport>,
    script: Mutex<Script>,
    requests: Mutex<Vec<ExecuteRequest>>,
    next_pid: AtomicU32,
}

impl MockControlPlane {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            bus: EventBus::new(),
            spawn_calls: AtomicUsize::new(0),
            kill_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            spawn_mode: Mutex::new(SpawnMode::Immediate),
            kill_fails: AtomicBool::new(false),
            status_failures: AtomicUsize::new(0),
            status_report: Mutex::new(ProcessStatusReport::default()),
            script: Mutex::new(Script::default()),
            requests: Mutex::new(Vec::new()),
            next_pid: AtomicU32::new(1000),
        })
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Context wired to this mock and its bus
    pub fn context(self: &Arc<Self>) -> AgentContext {
        AgentContext::new(Arc::clone(self) as Arc<dyn ControlPlane>, self.bus.clone())
    }

    pub fn set_spawn_mode(&self, mode: SpawnMode) {
        *self.spawn_mode.lock() = mode;
    }

    pub fn fail_kills(&self, fail: bool) {
        self.kill_fails.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` status polls fail
    pub fn fail_status_polls(&self, count: usize) {
        self.status_failures.store(count, Ordering::SeqCst);
    }

    pub fn set_status_report(&self, report: ProcessStatusReport) {
        *self.status_report.lock() = report;
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock() = script;
    }

    /// Every execute request seen so far
    pub fn requests(&self) -> Vec<ExecuteRequest> {
        self.requests.lock().clone()
    }

    pub fn spawns(&self) -> usize {
        self.spawn_calls.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kill_calls.load(Ordering::SeqCst)
    }
}

impl ControlPlane for MockControlPlane {
    fn spawn(&self, request: SpawnRequest) -> BoxFuture<'_, Result<ManagedProcess>> {
        self.spawn_calls.fetch_add(1, Ordering::SeqCst);
        let mode = self.spawn_mode.lock().clone();
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);

        Box::pin(async move {
            match mode {
                SpawnMode::Never => std::future::pending().await,
                SpawnMode::Fail(message) => Err(BridgeError::control_plane(message)),
                SpawnMode::Immediate => {
                    tokio::task::yield_now().await;
                    let now = Utc::now();
                    Ok(ManagedProcess {
                        id: ProcessId::generate(),
                        workspace_id: request.workspace_id,
                        agent_type: request.agent_type,
                        pid,
                        working_directory: request.working_directory,
                        status: ProcessStatus::Running,
                        started_at: now,
                        last_activity_at: now,
                        last_exit_code: None,
                        crashed: false,
                        can_restart: false,
                    })
                }
            }
        })
    }

    fn kill(&self, _request: KillRequest) -> BoxFuture<'_, Result<()>> {
        self.kill_calls.fetch_add(1, Ordering::SeqCst);
        let fail = self.kill_fails.load(Ordering::SeqCst);
        Box::pin(async move {
            if fail {
                Err(BridgeError::control_plane("kill rejected"))
            } else {
                Ok(())
            }
        })
    }

    fn status(&self, _request: StatusRequest) -> BoxFuture<'_, Result<ProcessStatusReport>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .status_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let report = self.status_report.lock().clone();
        Box::pin(async move {
            if failing {
                Err(BridgeError::timeout("status poll stalled"))
            } else {
                Ok(report)
            }
        })
    }

    fn check_agent(&self, agent_type: AgentType) -> BoxFuture<'_, Result<AgentStatus>> {
        Box::pin(async move {
            Ok(AgentStatus {
                agent_type,
                installed: true,
                authenticated: Some(true),
                version: Some("1.0.0".to_string()),
                binary_path: None,
                error: None,
            })
        })
    }

    fn execute(&self, request: ExecuteRequest) -> BoxFuture<'_, Result<ExecuteOutcome>> {
        let script = self.script.lock().clone();
        let session_id = request.session_id.clone();
        self.requests.lock().push(request);

        Box::pin(async move {
            for chunk in script.stderr {
                self.bus.publish(BusEvent::stderr(session_id.clone(), chunk));
            }
            for chunk in script.chunks {
                self.bus.publish(BusEvent::line(session_id.clone(), chunk));
            }
            if let Some(message) = script.bus_error {
                self.bus.publish(BusEvent::error(session_id.clone(), message));
            }
            if script.hold_open {
                return std::future::pending().await;
            }
            self.bus.publish(BusEvent::done(session_id));
            Ok(script.outcome)
        })
    }
}
