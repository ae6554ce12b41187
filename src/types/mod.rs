//! Type definitions for the agent bridge
//!
//! This module contains all the type definitions used throughout the crate,
//! organized into logical submodules:
//!
//! - [`identifiers`] - Type-safe ID wrappers (`SessionId`, `WorkspaceId`, `ProcessId`)
//! - [`events`] - The normalized `StreamEvent` union
//! - [`process`] - Agent kinds and managed process records
//! - [`agent`] - Chat history and the per-agent status map
//! - [`options`] - Manager configuration and per-send options

pub mod agent;
pub mod events;
pub mod identifiers;
pub mod options;
pub mod process;

// Re-export commonly used types
pub use agent::{AgentStatus, AgentStatusMap, ChatMessage, Role};
pub use events::StreamEvent;
pub use identifiers::{ProcessId, SessionId, WorkspaceId};
pub use options::{
    DEFAULT_MAX_PROCESSES, DEFAULT_SPAWN_TIMEOUT, HARD_PROCESS_CEILING, ManagerConfig,
    ManagerConfigBuilder, SendOptions, SendOptionsBuilder, StopHandle,
};
pub use process::{AgentType, ManagedProcess, ProcessStatus, ProcessStatusReport};
