//! Conversation and agent status types
//!
//! This module contains the chat history types adapters turn into prompts and
//! the per-agent status map that replaces ambient global status caches.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::process::AgentType;

// ============================================================================
// Conversation Types
// ============================================================================

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message written by the user
    User,
    /// Message produced by the agent
    Assistant,
    /// Out-of-band instructions
    System,
}

/// One entry of the conversation history handed to an adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

// ============================================================================
// Agent Status
// ============================================================================

/// Installation/authentication probe result for one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    /// Agent the probe was run for
    pub agent_type: AgentType,
    /// Whether the CLI binary is installed
    pub installed: bool,
    /// Whether the CLI is authenticated; `None` when the probe cannot tell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<bool>,
    /// CLI version string, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Resolved binary path, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_path: Option<PathBuf>,
    /// Probe failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentStatus {
    /// Status for an agent whose binary could not be found
    pub fn not_installed(agent_type: AgentType, error: impl Into<String>) -> Self {
        Self {
            agent_type,
            installed: false,
            authenticated: None,
            version: None,
            binary_path: None,
            error: Some(error.into()),
        }
    }

    /// Whether the agent can be used for a send
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.installed && self.authenticated != Some(false)
    }
}

/// Per-agent status map
///
/// Owned by an [`AgentContext`](crate::control::AgentContext) and shared by
/// handle; there is no process-wide status global.
#[derive(Debug, Clone, Default)]
pub struct AgentStatusMap {
    inner: Arc<RwLock<HashMap<AgentType, AgentStatus>>>,
}

impl AgentStatusMap {
    /// Create an empty status map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded status for an agent
    #[must_use]
    pub fn get(&self, agent_type: AgentType) -> Option<AgentStatus> {
        self.inner.read().get(&agent_type).cloned()
    }

    /// Record a probe result, replacing any earlier one for the same agent
    pub fn set(&self, status: AgentStatus) {
        self.inner.write().insert(status.agent_type, status);
    }

    /// Forget the recorded status for an agent
    pub fn clear(&self, agent_type: AgentType) -> Option<AgentStatus> {
        self.inner.write().remove(&agent_type)
    }

    /// All recorded statuses, ordered by agent type
    #[must_use]
    pub fn snapshot(&self) -> Vec<AgentStatus> {
        let mut statuses: Vec<AgentStatus> = self.inner.read().values().cloned().collect();
        statuses.sort_by_key(|status| status.agent_type);
        statuses
    }
}
