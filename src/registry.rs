//! Static registry of supported agents
//!
//! Maps stable agent ids (`"claude-code"`, `"codex"`, ...) to display
//! metadata and the adapter that drives the agent. The table is built at
//! compile time; lookups never allocate.

use serde::Serialize;

use crate::adapters::{
    AgentAdapter, ClaudeCodeAdapter, CodexAdapter, CursorAgentAdapter, OpenCodeAdapter,
};
use crate::error::{BridgeError, Result};
use crate::types::process::AgentType;

/// Display metadata for one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgentDisplayConfig {
    /// Stable id, same as `AgentType::as_str`
    pub id: &'static str,
    /// Agent kind
    pub agent_type: AgentType,
    /// Human-readable name
    pub name: &'static str,
    /// Company or project behind the agent
    pub provider: &'static str,
    /// One-line description
    pub description: &'static str,
    /// CLI binary name
    pub binary: &'static str,
}

/// One registry row
#[derive(Clone, Copy)]
pub struct AgentEntry {
    /// Adapter driving this agent
    pub adapter: &'static dyn AgentAdapter,
    /// Display metadata
    pub config: AgentDisplayConfig,
}

impl std::fmt::Debug for AgentEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentEntry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

static CLAUDE_CODE: ClaudeCodeAdapter = ClaudeCodeAdapter;
static CURSOR_AGENT: CursorAgentAdapter = CursorAgentAdapter;
static OPENCODE: OpenCodeAdapter = OpenCodeAdapter;
static CODEX: CodexAdapter = CodexAdapter;

static AGENTS: [AgentEntry; 4] = [
    AgentEntry {
        adapter: &CLAUDE_CODE,
        config: AgentDisplayConfig {
            id: "claude-code",
            agent_type: AgentType::ClaudeCode,
            name: "Claude Code",
            provider: "Anthropic",
            description: "Anthropic's agentic coding CLI",
            binary: "claude",
        },
    },
    AgentEntry {
        adapter: &CURSOR_AGENT,
        config: AgentDisplayConfig {
            id: "cursor-agent",
            agent_type: AgentType::CursorAgent,
            name: "Cursor Agent",
            provider: "Cursor",
            description: "Cursor's headless coding agent",
            binary: "cursor-agent",
        },
    },
    AgentEntry {
        adapter: &OPENCODE,
        config: AgentDisplayConfig {
            id: "opencode",
            agent_type: AgentType::OpenCode,
            name: "OpenCode",
            provider: "OpenCode",
            description: "Open-source terminal coding agent",
            binary: "opencode",
        },
    },
    AgentEntry {
        adapter: &CODEX,
        config: AgentDisplayConfig {
            id: "codex",
            agent_type: AgentType::Codex,
            name: "Codex",
            provider: "OpenAI",
            description: "OpenAI's coding agent CLI",
            binary: "codex",
        },
    },
];

/// Whether `id` names a registered agent
#[must_use]
pub fn is_valid_agent_id(id: &str) -> bool {
    find(id).is_some()
}

/// Display metadata for an agent id
#[must_use]
pub fn get_config(id: &str) -> Option<&'static AgentDisplayConfig> {
    find(id).map(|entry| &entry.config)
}

/// Adapter for an agent id
///
/// # Errors
/// Returns `BridgeError::UnknownAgent` if the id is not registered.
pub fn get_adapter(id: &str) -> Result<&'static dyn AgentAdapter> {
    find(id)
        .map(|entry| entry.adapter)
        .ok_or_else(|| BridgeError::unknown_agent(id))
}

/// Adapter for an agent type; every type is registered
#[must_use]
pub fn adapter_for(agent_type: AgentType) -> &'static dyn AgentAdapter {
    match agent_type {
        AgentType::ClaudeCode => &CLAUDE_CODE,
        AgentType::CursorAgent => &CURSOR_AGENT,
        AgentType::OpenCode => &OPENCODE,
        AgentType::Codex => &CODEX,
    }
}

/// Every registered agent, in registration order
#[must_use]
pub fn all_agents() -> &'static [AgentEntry] {
    &AGENTS
}

/// Agents grouped by provider
///
/// Providers appear in the order of their first registered agent.
#[must_use]
pub fn agents_by_provider() -> Vec<(&'static str, Vec<&'static AgentEntry>)> {
    let mut groups: Vec<(&'static str, Vec<&'static AgentEntry>)> = Vec::new();
    for entry in &AGENTS {
        match groups
            .iter_mut()
            .find(|(provider, _)| *provider == entry.config.provider)
        {
            Some((_, entries)) => entries.push(entry),
            None => groups.push((entry.config.provider, vec![entry])),
        }
    }
    groups
}

fn find(id: &str) -> Option<&'static AgentEntry> {
    AGENTS.iter().find(|entry| entry.config.id == id)
}
