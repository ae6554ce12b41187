//! Local process transport
//!
//! Hosts that do not provide their own subprocess runtime can use
//! [`LocalControlPlane`], which implements [`ControlPlane`](crate::ControlPlane)
//! on top of `tokio::process`.

pub mod subprocess;

pub use subprocess::{LaunchCommand, LocalControlPlane, find_binary};
