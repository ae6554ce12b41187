//! Agent kinds and managed process records

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::{ProcessId, WorkspaceId};
use crate::error::BridgeError;

// ============================================================================
// Agent Type
// ============================================================================

/// Supported local agent kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    /// Claude Code CLI (`claude`)
    ClaudeCode,
    /// Cursor Agent CLI (`cursor-agent`)
    CursorAgent,
    /// OpenCode CLI (`opencode`)
    OpenCode,
    /// Codex CLI (`codex`)
    Codex,
}

impl AgentType {
    /// Every supported agent kind, in registry order
    pub const ALL: [AgentType; 4] = [
        AgentType::ClaudeCode,
        AgentType::CursorAgent,
        AgentType::OpenCode,
        AgentType::Codex,
    ];

    /// Stable identifier used on the wire and in the registry
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude-code",
            Self::CursorAgent => "cursor-agent",
            Self::OpenCode => "opencode",
            Self::Codex => "codex",
        }
    }

    /// Name of the CLI binary
    #[must_use]
    pub fn binary(self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude",
            Self::CursorAgent => "cursor-agent",
            Self::OpenCode => "opencode",
            Self::Codex => "codex",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|agent| agent.as_str() == s)
            .ok_or_else(|| BridgeError::unknown_agent(s))
    }
}

// ============================================================================
// Managed Process
// ============================================================================

/// Lifecycle status of a managed process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    /// Spawn accepted, process not yet confirmed running
    Starting,
    /// Process is running
    Running,
    /// Process is in an error state
    Error,
    /// Process has exited
    Exited,
}

/// One live or recently-live subprocess bound to exactly one workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedProcess {
    /// Opaque handle issued by the control plane
    pub id: ProcessId,
    /// Workspace this process belongs to
    pub workspace_id: WorkspaceId,
    /// Agent kind running in the process
    pub agent_type: AgentType,
    /// OS process id
    pub pid: u32,
    /// Directory the process was started in
    pub working_directory: PathBuf,
    /// Lifecycle status
    pub status: ProcessStatus,
    /// When the process was spawned
    pub started_at: DateTime<Utc>,
    /// Last time the process was seen doing something
    pub last_activity_at: DateTime<Utc>,
    /// Exit code of the last exit, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exit_code: Option<i32>,
    /// Whether the process exited abnormally
    #[serde(default)]
    pub crashed: bool,
    /// Whether the process may be restarted in place
    #[serde(default)]
    pub can_restart: bool,
}

impl ManagedProcess {
    /// Overlay the fields a status poll reported
    ///
    /// Fields the report leaves out keep their current values.
    pub fn apply_report(&mut self, report: &ProcessStatusReport) {
        if let Some(status) = report.status {
            self.status = status;
        }
        if let Some(code) = report.last_exit_code {
            self.last_exit_code = Some(code);
        }
        if let Some(crashed) = report.crashed {
            self.crashed = crashed;
        }
        if let Some(can_restart) = report.can_restart {
            self.can_restart = can_restart;
        }
        if let Some(pid) = report.pid {
            self.pid = pid;
        }
        if let Some(at) = report.last_activity_at {
            self.last_activity_at = at;
        }
    }

    /// Whether the process is still considered alive
    #[must_use]
    pub fn is_alive(&self) -> bool {
        matches!(self.status, ProcessStatus::Starting | ProcessStatus::Running)
    }
}

/// Partial process state reported by a control-plane status poll
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessStatusReport {
    /// Reported lifecycle status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProcessStatus>,
    /// Reported exit code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_exit_code: Option<i32>,
    /// Reported crash flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crashed: Option<bool>,
    /// Reported restart eligibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_restart: Option<bool>,
    /// Reported OS process id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Reported activity timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<DateTime<Utc>>,
}
