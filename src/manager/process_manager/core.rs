//! Core process manager structure, cache queries and shutdown

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::control::ControlPlane;
use crate::error::Result;
use crate::types::identifiers::WorkspaceId;
use crate::types::options::ManagerConfig;
use crate::types::process::ManagedProcess;

use super::gate::GateMap;

// ============================================================================
// PROCESS CACHE
// ============================================================================

/// Cached processes plus the workspaces with a spawn in flight
///
/// In-flight spawns count against the capacity limit so concurrent spawns
/// for different workspaces cannot overshoot it.
#[derive(Debug, Default)]
pub(crate) struct ProcessCache {
    pub(crate) processes: HashMap<WorkspaceId, ManagedProcess>,
    pub(crate) pending: HashSet<WorkspaceId>,
}

impl ProcessCache {
    pub(crate) fn occupied(&self) -> usize {
        self.processes.len() + self.pending.len()
    }
}

// ============================================================================
// PROCESS MANAGER CORE
// ============================================================================

/// Owner of the workspace-to-process mapping
///
/// The `ProcessManager` coordinates agent subprocesses across workspaces:
/// - At most one cached process per workspace (spawn is idempotent)
/// - A configurable soft limit capped by a fixed hard ceiling
/// - Timeout-guarded control-plane spawns
/// - Status polls merged into the cache
///
/// Calls for different workspaces never wait on each other; calls for the
/// same workspace are serialized so two spawns cannot both insert.
pub struct ProcessManager {
    pub(crate) control: Arc<dyn ControlPlane>,
    pub(crate) config: ManagerConfig,
    pub(crate) cache: Mutex<ProcessCache>,
    pub(crate) gates: GateMap,
}

impl ProcessManager {
    /// Create a manager with the default configuration
    #[must_use]
    pub fn new(control: Arc<dyn ControlPlane>) -> Self {
        Self::with_config(control, ManagerConfig::default())
    }

    /// Create a manager with an explicit configuration
    #[must_use]
    pub fn with_config(control: Arc<dyn ControlPlane>, config: ManagerConfig) -> Self {
        Self {
            control,
            config,
            cache: Mutex::new(ProcessCache::default()),
            gates: GateMap::default(),
        }
    }

    /// Configuration this manager was built with
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Limit actually enforced: the soft limit capped by the hard ceiling
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.config.effective_limit()
    }

    /// Cached process for a workspace, without polling
    #[must_use]
    pub fn get(&self, workspace_id: &WorkspaceId) -> Option<ManagedProcess> {
        self.cache.lock().processes.get(workspace_id).cloned()
    }

    /// Owned snapshot of every cached process, ordered by workspace id
    #[must_use]
    pub fn list(&self) -> Vec<ManagedProcess> {
        let mut processes: Vec<ManagedProcess> =
            self.cache.lock().processes.values().cloned().collect();
        processes.sort_by(|a, b| a.workspace_id.cmp(&b.workspace_id));
        processes
    }

    /// Number of cached processes
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().processes.len()
    }

    /// Whether no process is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.lock().processes.is_empty()
    }
}

impl ProcessManager {
    /// Kill every cached process and clear the cache
    ///
    /// Termination failures are logged and do not stop the sweep; every
    /// entry is removed regardless.
    pub async fn shutdown(&self) -> Result<()> {
        log::info!("Shutting down ProcessManager...");

        let workspace_ids: Vec<WorkspaceId> = {
            let cache = self.cache.lock();
            cache.processes.keys().cloned().collect()
        };

        for workspace_id in workspace_ids {
            log::debug!("Terminating process for workspace: {workspace_id}");
            if let Err(e) = self.kill(&workspace_id).await {
                log::warn!("Failed to terminate process for workspace {workspace_id}: {e}");
            }
        }

        self.cache.lock().processes.clear();
        log::info!("ProcessManager shutdown complete");
        Ok(())
    }
}
