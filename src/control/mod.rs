//! Collaborator boundaries: the subprocess control plane and the event bus
//!
//! [`AgentContext`] bundles both with the per-agent status map so adapters
//! receive everything they need by reference instead of reaching for globals.

pub mod bus;
pub mod plane;

use std::sync::Arc;

pub use bus::{BusEvent, BusEventKind, EventBus, Subscription};
pub use plane::{
    ControlPlane, ExecuteOutcome, ExecuteRequest, KillRequest, SpawnRequest, StatusRequest,
};

use crate::types::agent::AgentStatusMap;

/// Shared handles an adapter needs to drive a session
#[derive(Clone)]
pub struct AgentContext {
    control: Arc<dyn ControlPlane>,
    bus: EventBus,
    statuses: AgentStatusMap,
}

impl std::fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentContext")
            .field("control", &"<control plane>")
            .field("bus", &self.bus)
            .field("statuses", &self.statuses)
            .finish()
    }
}

impl AgentContext {
    /// Create a context with an empty status map
    pub fn new(control: Arc<dyn ControlPlane>, bus: EventBus) -> Self {
        Self {
            control,
            bus,
            statuses: AgentStatusMap::new(),
        }
    }

    /// Use an existing status map
    #[must_use]
    pub fn with_status_map(mut self, statuses: AgentStatusMap) -> Self {
        self.statuses = statuses;
        self
    }

    /// The control plane
    #[must_use]
    pub fn control(&self) -> &Arc<dyn ControlPlane> {
        &self.control
    }

    /// The event bus
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The per-agent status map
    #[must_use]
    pub fn statuses(&self) -> &AgentStatusMap {
        &self.statuses
    }
}
