//! Agent process management
//!
//! Provides `ProcessManager`, the sole owner of the workspace-to-process
//! cache. It enforces the concurrency ceiling, guards stalled control-plane
//! spawns with a timeout and merges status polls into cached entries.

mod process_manager;

pub use process_manager::ProcessManager;
