//! Process lifecycle manager implementation
//!
//! This module is organized into logical submodules:
//! - `core`: Core struct, constructors, cache queries and shutdown
//! - `gate`: Per-workspace serialization of spawn/kill
//! - `spawn`: Idempotent, capacity-checked, timeout-guarded spawning
//! - `status`: Status polling and merging
//! - `termination`: Kill and restart

mod core;
mod gate;
mod spawn;
mod status;
mod termination;

pub use core::ProcessManager;
