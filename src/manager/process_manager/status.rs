//! Status polling

use crate::control::StatusRequest;
use crate::error::Result;
use crate::types::identifiers::WorkspaceId;
use crate::types::process::ManagedProcess;

use super::core::ProcessManager;

impl ProcessManager {
    /// Poll the control plane and merge the report into the cache
    ///
    /// Returns `Ok(None)` if no process is cached for the workspace, or if
    /// it was killed or replaced while the poll was in flight.
    ///
    /// # Errors
    /// Propagates the control plane's error so callers can retry with
    /// [`retry_with_exponential_backoff`](crate::retry_with_exponential_backoff).
    pub async fn try_get_status(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Option<ManagedProcess>> {
        let Some(cached) = self.get(workspace_id) else {
            return Ok(None);
        };

        let report = self
            .control
            .status(StatusRequest {
                workspace_id: workspace_id.clone(),
                process_id: cached.id.clone(),
            })
            .await?;

        let mut cache = self.cache.lock();
        let Some(entry) = cache
            .processes
            .get_mut(workspace_id)
            .filter(|entry| entry.id == cached.id)
        else {
            return Ok(None);
        };
        entry.apply_report(&report);
        Ok(Some(entry.clone()))
    }

    /// Poll and merge, never failing
    ///
    /// A failed poll is logged and the last cached state is returned.
    pub async fn get_status(&self, workspace_id: &WorkspaceId) -> Option<ManagedProcess> {
        match self.try_get_status(workspace_id).await {
            Ok(process) => process,
            Err(e) => {
                log::warn!("Status poll for workspace {workspace_id} failed: {e}");
                self.get(workspace_id)
            }
        }
    }
}
