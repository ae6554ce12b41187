//! Per-workspace gates
//!
//! Each workspace gets its own async mutex, created on first use and dropped
//! once nobody holds or waits on it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::types::identifiers::WorkspaceId;

type Gate = Arc<tokio::sync::Mutex<()>>;

#[derive(Default)]
pub(crate) struct GateMap {
    gates: Mutex<HashMap<WorkspaceId, Gate>>,
}

impl GateMap {
    /// Wait until no other spawn/kill holds this workspace
    pub(crate) async fn acquire(&self, workspace_id: &WorkspaceId) -> WorkspaceGuard<'_> {
        let gate = {
            let mut gates = self.gates.lock();
            Arc::clone(gates.entry(workspace_id.clone()).or_default())
        };
        let guard = gate.lock_owned().await;

        WorkspaceGuard {
            map: self,
            workspace_id: workspace_id.clone(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.gates.lock().len()
    }
}

/// Held for the duration of one spawn/kill on a workspace
pub(crate) struct WorkspaceGuard<'a> {
    map: &'a GateMap,
    workspace_id: WorkspaceId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for WorkspaceGuard<'_> {
    fn drop(&mut self) {
        // Release first so the map entry is the only remaining reference
        drop(self.guard.take());

        let mut gates = self.map.gates.lock();
        if gates
            .get(&self.workspace_id)
            .is_some_and(|gate| Arc::strong_count(gate) == 1)
        {
            gates.remove(&self.workspace_id);
        }
    }
}
