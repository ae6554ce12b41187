//! # Agent Bridge
//!
//! Drive local coding-agent CLIs (Claude Code, Cursor Agent, OpenCode,
//! Codex) from Rust through one normalized event stream.
//!
//! Every agent speaks its own streaming JSON dialect. This crate turns each
//! of them into the same [`StreamEvent`] sequence (`Text`, `Thinking`,
//! `ToolUse`, `ToolResult`, `Error`, `Done`), and manages the long-lived
//! processes that back each workspace.
//!
//! ## Quick Start
//!
//! Send one message and print the reply as it streams:
//!
//! ```no_run
//! use std::sync::Arc;
//! use agent_bridge::{
//!     AgentContext, ChatMessage, EventBus, LocalControlPlane, SendOptions, StreamEvent, registry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = EventBus::new();
//!     let ctx = AgentContext::new(Arc::new(LocalControlPlane::new(bus.clone())), bus);
//!     let adapter = registry::get_adapter("claude-code")?;
//!
//!     let history = [ChatMessage::user("What is 2 + 2?")];
//!     let mut on_stream = |event: StreamEvent| {
//!         if let StreamEvent::Text { content } = event {
//!             print!("{content}");
//!         }
//!     };
//!     let outcome = adapter
//!         .send_message(&ctx, &history, SendOptions::default(), &mut on_stream)
//!         .await?;
//!     println!("\nfinal: {}", outcome.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Core Features
//!
//! ### 1. Protocol adapters
//!
//! [`AgentAdapter::parse_output`] maps one raw output line to at most one
//! event. It is pure and never fails, so protocols can be tested line by
//! line without spawning anything:
//!
//! ```
//! use agent_bridge::{AgentAdapter, ClaudeCodeAdapter, StreamEvent};
//!
//! let event = ClaudeCodeAdapter.parse_output(r#"{"type":"content_block_delta","delta":{"text":"Hi"}}"#);
//! assert_eq!(event, Some(StreamEvent::text("Hi")));
//! assert_eq!(ClaudeCodeAdapter.parse_output(""), None);
//! ```
//!
//! ### 2. Process lifecycle
//!
//! [`ProcessManager`] keeps at most one process per workspace, enforces a
//! configurable soft limit under a fixed hard ceiling of
//! [`HARD_PROCESS_CEILING`], and rejects control-plane spawns that stall
//! past the configured timeout:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use agent_bridge::{AgentType, EventBus, LocalControlPlane, ManagerConfig, ProcessManager, WorkspaceId};
//! # async fn example() -> agent_bridge::Result<()> {
//! let control = Arc::new(LocalControlPlane::new(EventBus::new()));
//! let manager = ProcessManager::with_config(control, ManagerConfig::builder().max_processes(2).build());
//!
//! let workspace = WorkspaceId::from("ws-1");
//! let process = manager.spawn(&workspace, AgentType::Codex, "/tmp/project").await?;
//! let refreshed = manager.get_status(&workspace).await;
//! manager.kill(&workspace).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### 3. Streaming utilities
//!
//! - [`LineBuffer`] reassembles lines from arbitrary chunks
//! - [`parse_json_line`] decodes a line, reporting malformed input as an
//!   `Error` event instead of failing
//! - [`retry_with_exponential_backoff`] retries transient failures with an
//!   injectable sleep
//!
//! ### 4. Collaborator boundaries
//!
//! The crate does not assume how processes are started. Hosts implement
//! [`ControlPlane`] and publish subprocess output on an [`EventBus`];
//! [`LocalControlPlane`] is a ready-made `tokio::process` implementation.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`], an alias for
//! `std::result::Result<T, BridgeError>`. [`BridgeError::is_transient`]
//! tells retryable failures apart:
//!
//! ```no_run
//! # use agent_bridge::{BridgeError, Result};
//! # fn handle(result: Result<()>) {
//! match result {
//!     Err(BridgeError::CapacityExceeded { limit }) => eprintln!("limit {limit} reached"),
//!     Err(e) if e.is_transient() => eprintln!("retry later: {e}"),
//!     Err(BridgeError::Process { stderr, .. }) => eprintln!("agent failed: {stderr:?}"),
//!     Err(e) => eprintln!("error: {e}"),
//!     Ok(()) => {}
//! }
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`adapters`] - One protocol adapter per agent CLI
//! - [`control`] - Control-plane trait, event bus and adapter context
//! - [`error`] - Error types
//! - [`manager`] - Process lifecycle manager
//! - [`registry`] - Static agent registry
//! - [`stream`] - Line buffer, safe JSON parsing, retry, session driver
//! - [`transport`] - Local subprocess control plane
//! - [`types`] - Data model and options

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod control;
pub mod error;
pub mod manager;
pub mod registry;
pub mod stream;
pub mod transport;
pub mod types;

// Re-export main types
pub use adapters::{
    AgentAdapter, ClaudeCodeAdapter, CodexAdapter, CursorAgentAdapter, OpenCodeAdapter,
};
pub use control::{
    AgentContext, BusEvent, BusEventKind, ControlPlane, EventBus, ExecuteOutcome, ExecuteRequest,
    KillRequest, SpawnRequest, StatusRequest, Subscription,
};
pub use error::{BridgeError, Result};
pub use manager::ProcessManager;
pub use registry::{AgentDisplayConfig, AgentEntry};
pub use stream::{
    EXIT_GRACE, LineBuffer, ParsedLine, RetryOptions, SendOutcome, SessionState, Transcript,
    parse_json_line, retry_delay, retry_with_exponential_backoff, run_session,
};
pub use transport::{LaunchCommand, LocalControlPlane, find_binary};

// Re-export types
pub use types::{
    AgentStatus, AgentStatusMap, AgentType, ChatMessage, DEFAULT_MAX_PROCESSES,
    DEFAULT_SPAWN_TIMEOUT, HARD_PROCESS_CEILING, ManagedProcess, ManagerConfig,
    ManagerConfigBuilder, ProcessId, ProcessStatus, ProcessStatusReport, Role, SendOptions,
    SendOptionsBuilder, SessionId, StopHandle, StreamEvent, WorkspaceId,
};

/// Version of the agent bridge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
