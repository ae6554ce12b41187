//! Process spawning
//!
//! Idempotent per workspace, capacity-checked and timeout-guarded.

use std::path::PathBuf;

use crate::control::SpawnRequest;
use crate::error::{BridgeError, Result};
use crate::types::identifiers::WorkspaceId;
use crate::types::process::{AgentType, ManagedProcess};

use super::core::ProcessManager;

/// Capacity reservation for a spawn in flight
///
/// Dropping it releases the slot, whether the spawn succeeded, failed or
/// was cancelled.
struct PendingSpawn<'a> {
    manager: &'a ProcessManager,
    workspace_id: WorkspaceId,
}

impl Drop for PendingSpawn<'_> {
    fn drop(&mut self) {
        self.manager.cache.lock().pending.remove(&self.workspace_id);
    }
}

impl ProcessManager {
    /// Ensure a process is running for `workspace_id`
    ///
    /// Returns the cached process unchanged if one exists; the control plane
    /// is only called for workspaces without an entry.
    ///
    /// # Errors
    /// - `BridgeError::CapacityExceeded` when the effective limit is reached
    /// - `BridgeError::Timeout` when the control plane stalls past
    ///   `spawn_timeout`; nothing is cached in that case
    /// - any error the control plane returns
    pub async fn spawn(
        &self,
        workspace_id: &WorkspaceId,
        agent_type: AgentType,
        working_directory: impl Into<PathBuf>,
    ) -> Result<ManagedProcess> {
        let _gate = self.gates.acquire(workspace_id).await;

        if let Some(existing) = self.get(workspace_id) {
            log::debug!("Reusing {} process for workspace {workspace_id}", existing.agent_type);
            return Ok(existing);
        }

        let reservation = self.reserve(workspace_id)?;
        let request = SpawnRequest {
            workspace_id: workspace_id.clone(),
            agent_type,
            working_directory: working_directory.into(),
        };

        let timeout = self.config.spawn_timeout;
        let mut process = tokio::time::timeout(timeout, self.control.spawn(request))
            .await
            .map_err(|_| {
                log::warn!("Spawn for workspace {workspace_id} timed out");
                BridgeError::timeout(format!(
                    "spawning {agent_type} for workspace {workspace_id} exceeded {}ms",
                    timeout.as_millis()
                ))
            })??;

        // The cache key is authoritative
        process.workspace_id = workspace_id.clone();

        {
            let mut cache = self.cache.lock();
            cache.processes.insert(workspace_id.clone(), process.clone());
        }
        drop(reservation);

        log::info!(
            "Spawned {agent_type} process {} (pid {}) for workspace {workspace_id}",
            process.id,
            process.pid
        );
        Ok(process)
    }

    fn reserve(&self, workspace_id: &WorkspaceId) -> Result<PendingSpawn<'_>> {
        let limit = self.effective_limit();
        let mut cache = self.cache.lock();

        if cache.occupied() >= limit {
            log::warn!("Refusing spawn for workspace {workspace_id}: limit {limit} reached");
            return Err(BridgeError::capacity_exceeded(limit));
        }
        cache.pending.insert(workspace_id.clone());

        Ok(PendingSpawn {
            manager: self,
            workspace_id: workspace_id.clone(),
        })
    }
}
