//! Kill and restart

use crate::control::KillRequest;
use crate::error::{BridgeError, Result};
use crate::types::identifiers::WorkspaceId;
use crate::types::process::ManagedProcess;

use super::core::ProcessManager;

impl ProcessManager {
    /// Terminate the process for a workspace
    ///
    /// The cache entry is removed before the control plane is called, so it
    /// is gone even if termination fails. Killing a workspace with no cached
    /// process is a no-op.
    ///
    /// # Errors
    /// Returns the control plane's termination error, after the entry has
    /// already been removed.
    pub async fn kill(&self, workspace_id: &WorkspaceId) -> Result<()> {
        let _gate = self.gates.acquire(workspace_id).await;

        let Some(process) = self.cache.lock().processes.remove(workspace_id) else {
            log::debug!("Kill for workspace {workspace_id}: nothing cached");
            return Ok(());
        };

        log::info!(
            "Killing {} process {} for workspace {workspace_id}",
            process.agent_type,
            process.id
        );
        self.control
            .kill(KillRequest {
                workspace_id: workspace_id.clone(),
                process_id: process.id,
            })
            .await
            .inspect_err(|e| {
                log::warn!("Termination for workspace {workspace_id} reported failure: {e}");
            })
    }

    /// Kill and respawn a process that is eligible for restart
    ///
    /// The new process uses the same agent type and working directory.
    ///
    /// # Errors
    /// - `BridgeError::ProcessNotFound` if nothing is cached
    /// - `BridgeError::RestartNotAllowed` if the entry's `can_restart` is false
    /// - any error from the respawn
    pub async fn restart(&self, workspace_id: &WorkspaceId) -> Result<ManagedProcess> {
        let current = self
            .get(workspace_id)
            .ok_or_else(|| BridgeError::process_not_found(workspace_id.as_str()))?;
        if !current.can_restart {
            return Err(BridgeError::RestartNotAllowed(workspace_id.to_string()));
        }

        if let Err(e) = self.kill(workspace_id).await {
            log::warn!("Restart of workspace {workspace_id} continuing after kill failure: {e}");
        }
        self.spawn(workspace_id, current.agent_type, current.working_directory)
            .await
    }
}
