//! Long-lived process lifecycle (spawn, status, kill)

use chrono::Utc;
use tokio::process::Child;

use crate::control::{KillRequest, SpawnRequest, StatusRequest};
use crate::error::{BridgeError, Result};
use crate::types::identifiers::{ProcessId, WorkspaceId};
use crate::types::process::{ManagedProcess, ProcessStatus, ProcessStatusReport};

use super::command::{CommandBuilder, resolve_program};
use super::plane::LocalControlPlane;
use super::reader::drain_to_log;

/// A child started for a workspace
pub(super) struct ChildEntry {
    pub(super) workspace_id: WorkspaceId,
    pub(super) child: Child,
}

impl LocalControlPlane {
    pub(super) async fn spawn_impl(&self, request: SpawnRequest) -> Result<ManagedProcess> {
        let launch = self.launch_command(request.agent_type).ok_or_else(|| {
            BridgeError::control_plane(format!(
                "no launch command registered for {}",
                request.agent_type
            ))
        })?;

        let program = resolve_program(&launch.program)?;
        let builder = CommandBuilder::new(&program, &launch.args, &launch.env)
            .cwd(Some(request.working_directory.as_path()))
            .pipe_stdin(true);
        let mut child = builder
            .build()
            .spawn()
            .map_err(|e| BridgeError::control_plane(builder.spawn_error(&e)))?;

        let pid = child.id().unwrap_or_default();
        let label = format!("{}:{}", request.workspace_id, request.agent_type);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(drain_to_log(stdout, label.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_to_log(stderr, label));
        }

        let id = ProcessId::generate();
        let now = Utc::now();
        self.children.lock().insert(
            id.clone(),
            ChildEntry {
                workspace_id: request.workspace_id.clone(),
                child,
            },
        );
        log::info!(
            "Started {} (pid {pid}) for workspace {}",
            program.display(),
            request.workspace_id
        );

        Ok(ManagedProcess {
            id,
            workspace_id: request.workspace_id,
            agent_type: request.agent_type,
            pid,
            working_directory: request.working_directory,
            status: ProcessStatus::Running,
            started_at: now,
            last_activity_at: now,
            last_exit_code: None,
            crashed: false,
            can_restart: false,
        })
    }

    pub(super) fn status_impl(&self, request: &StatusRequest) -> Result<ProcessStatusReport> {
        let mut children = self.children.lock();
        let Some(entry) = children.get_mut(&request.process_id) else {
            // Killed or never started here
            return Ok(ProcessStatusReport {
                status: Some(ProcessStatus::Exited),
                ..ProcessStatusReport::default()
            });
        };

        if entry.workspace_id != request.workspace_id {
            return Err(BridgeError::control_plane(format!(
                "process {} does not belong to workspace {}",
                request.process_id, request.workspace_id
            )));
        }

        match entry.child.try_wait()? {
            None => Ok(ProcessStatusReport {
                status: Some(ProcessStatus::Running),
                ..ProcessStatusReport::default()
            }),
            Some(exit) => {
                let crashed = !exit.success();
                Ok(ProcessStatusReport {
                    status: Some(if crashed {
                        ProcessStatus::Error
                    } else {
                        ProcessStatus::Exited
                    }),
                    last_exit_code: exit.code(),
                    crashed: Some(crashed),
                    can_restart: Some(crashed),
                    ..ProcessStatusReport::default()
                })
            }
        }
    }

    pub(super) async fn kill_impl(&self, request: KillRequest) -> Result<()> {
        let Some(mut entry) = self.children.lock().remove(&request.process_id) else {
            log::debug!("Kill for unknown process {}", request.process_id);
            return Ok(());
        };

        // Closed stdin is the polite signal; the grace period bounds the wait
        drop(entry.child.stdin.take());
        match tokio::time::timeout(self.kill_grace, entry.child.wait()).await {
            Ok(Ok(_status)) => {}
            Ok(Err(e)) => return Err(BridgeError::Io(e)),
            Err(_) => {
                log::debug!(
                    "Process {} ignored shutdown, killing",
                    request.process_id
                );
                entry.child.kill().await?;
            }
        }

        log::info!(
            "Stopped process {} for workspace {}",
            request.process_id,
            entry.workspace_id
        );
        Ok(())
    }

    /// Force-kill every tracked child
    pub(super) fn kill_all(&self) {
        for (_, mut entry) in self.children.lock().drain() {
            let _ = entry.child.start_kill();
        }
    }
}
