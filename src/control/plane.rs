//! Subprocess control-plane contract
//!
//! The host runtime owns the OS-level process primitives. This crate only
//! talks to it through the RPC-style [`ControlPlane`] trait.

use std::collections::HashMap;
use std::path::PathBuf;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::agent::AgentStatus;
use crate::types::identifiers::{ProcessId, SessionId, WorkspaceId};
use crate::types::process::{AgentType, ManagedProcess, ProcessStatusReport};

/// Request to start a long-lived agent process for a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRequest {
    /// Workspace the process belongs to
    pub workspace_id: WorkspaceId,
    /// Agent kind to start
    pub agent_type: AgentType,
    /// Directory to start the process in
    pub working_directory: PathBuf,
}

/// Request to terminate a workspace process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillRequest {
    /// Workspace the process belongs to
    pub workspace_id: WorkspaceId,
    /// Handle issued at spawn time
    pub process_id: ProcessId,
}

/// Request to poll a workspace process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    /// Workspace the process belongs to
    pub workspace_id: WorkspaceId,
    /// Handle issued at spawn time
    pub process_id: ProcessId,
}

/// Request to run one streaming exchange with an agent CLI
///
/// Output produced while the request runs is published on the event bus
/// tagged with `session_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    /// Correlation key for bus events
    pub session_id: SessionId,
    /// Agent kind being driven
    pub agent_type: AgentType,
    /// Program to run
    pub program: String,
    /// Program arguments
    pub args: Vec<String>,
    /// Directory to run in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    /// Extra environment variables
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    /// Text written to the program's stdin, which is then closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
}

/// How an execute request ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOutcome {
    /// Whether the program exited successfully
    pub success: bool,
    /// Program exit code, when it exited normally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Captured standard error output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl ExecuteOutcome {
    /// Outcome of a program that exited with status 0
    #[must_use]
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stderr: None,
        }
    }

    /// Outcome of a program that failed
    pub fn failure(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code,
            stderr: Some(stderr.into()),
        }
    }
}

/// Subprocess control plane provided by the host runtime
///
/// Methods return boxed futures so the trait stays object safe and can be
/// shared as `Arc<dyn ControlPlane>`.
pub trait ControlPlane: Send + Sync {
    /// Start a long-lived agent process
    fn spawn(&self, request: SpawnRequest) -> BoxFuture<'_, Result<ManagedProcess>>;

    /// Terminate a process started by [`ControlPlane::spawn`]
    fn kill(&self, request: KillRequest) -> BoxFuture<'_, Result<()>>;

    /// Poll a process; only the fields the host knows about are reported
    fn status(&self, request: StatusRequest) -> BoxFuture<'_, Result<ProcessStatusReport>>;

    /// Probe whether an agent CLI is installed and authenticated
    fn check_agent(&self, agent_type: AgentType) -> BoxFuture<'_, Result<AgentStatus>>;

    /// Run one streaming exchange; resolves when the program exits
    fn execute(&self, request: ExecuteRequest) -> BoxFuture<'_, Result<ExecuteOutcome>>;
}
