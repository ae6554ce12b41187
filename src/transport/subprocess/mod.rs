//! Subprocess control plane built on `tokio::process`
//!
//! - `config`: constants and launch command configuration
//! - `command`: binary discovery and command construction
//! - `reader`: stdout/stderr pumps publishing onto the event bus
//! - `lifecycle`: long-lived processes (spawn, status, kill)
//! - `plane`: the `ControlPlane` implementation

mod command;
mod config;
mod lifecycle;
mod plane;
mod reader;

pub use command::find_binary;
pub use config::LaunchCommand;
pub use plane::LocalControlPlane;
