//! Integration tests for `ProcessManager`
//!
//! Exercises caching, capacity limits, spawn timeouts, status merging and
//! termination against the in-memory control plane.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use agent_bridge::{
    AgentType, BridgeError, ControlPlane, ManagerConfig, ProcessManager, ProcessStatus,
    ProcessStatusReport, RetryOptions, WorkspaceId, retry_with_exponential_backoff,
};
use common::{MockControlPlane, SpawnMode, init_logging};
use futures::future::BoxFuture;

fn manager_with(mock: &Arc<MockControlPlane>, config: ManagerConfig) -> ProcessManager {
    ProcessManager::with_config(Arc::clone(mock) as Arc<dyn ControlPlane>, config)
}

fn manager(mock: &Arc<MockControlPlane>) -> ProcessManager {
    manager_with(mock, ManagerConfig::default())
}

#[tokio::test]
async fn test_spawn_is_idempotent_per_workspace() {
    init_logging();
    let mock = MockControlPlane::new();
    let manager = manager(&mock);
    let workspace = WorkspaceId::from("ws-1");

    let first = manager
        .spawn(&workspace, AgentType::ClaudeCode, "/tmp/ws-1")
        .await
        .expect("first spawn");
    let second = manager
        .spawn(&workspace, AgentType::Codex, "/elsewhere")
        .await
        .expect("second spawn");

    assert_eq!(first, second);
    assert_eq!(second.agent_type, AgentType::ClaudeCode);
    assert_eq!(mock.spawns(), 1);
    assert_eq!(manager.len(), 1);
}

#[tokio::test]
async fn test_concurrent_spawns_share_one_process() {
    let mock = MockControlPlane::new();
    let manager = manager(&mock);
    let workspace = WorkspaceId::from("ws-1");

    let (a, b) = tokio::join!(
        manager.spawn(&workspace, AgentType::OpenCode, "/tmp/ws-1"),
        manager.spawn(&workspace, AgentType::OpenCode, "/tmp/ws-1"),
    );

    assert_eq!(a.expect("spawn a"), b.expect("spawn b"));
    assert_eq!(mock.spawns(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_workspace_does_not_block_others() {
    let mock = MockControlPlane::new();
    let manager = manager_with(
        &mock,
        ManagerConfig::builder()
            .spawn_timeout(Duration::from_secs(10))
            .build(),
    );
    mock.set_spawn_mode(SpawnMode::Never);
    let started = tokio::time::Instant::now();

    let ws_a = WorkspaceId::from("a");
    let (a, (b, b_elapsed)) = tokio::join!(
        manager.spawn(&ws_a, AgentType::ClaudeCode, "/tmp/a"),
        async {
            // Wait until "a" is parked inside the control plane
            while mock.spawns() == 0 {
                tokio::task::yield_now().await;
            }
            mock.set_spawn_mode(SpawnMode::Immediate);
            let result = manager
                .spawn(&WorkspaceId::from("b"), AgentType::Codex, "/tmp/b")
                .await;
            (result, started.elapsed())
        },
    );

    let b = b.expect("b must not wait for a");
    assert_eq!(b.workspace_id, WorkspaceId::from("b"));
    assert!(b_elapsed < Duration::from_secs(1));
    assert!(matches!(a, Err(BridgeError::Timeout(_))));
    assert_eq!(mock.spawns(), 2);
    assert!(manager.get(&WorkspaceId::from("a")).is_none());
    assert_eq!(manager.len(), 1);
}

#[tokio::test]
async fn test_cached_workspace_id_is_authoritative() {
    let mock = MockControlPlane::new();
    let manager = manager(&mock);
    let workspace = WorkspaceId::from("ws-7");

    let process = manager
        .spawn(&workspace, AgentType::Codex, "/tmp")
        .await
        .expect("spawn");

    assert_eq!(process.workspace_id, workspace);
    assert_eq!(process.status, ProcessStatus::Running);
}

#[tokio::test]
async fn test_soft_limit_rejects_extra_spawn() {
    let mock = MockControlPlane::new();
    let manager = manager_with(&mock, ManagerConfig::builder().max_processes(2).build());

    for id in ["a", "b"] {
        manager
            .spawn(&WorkspaceId::from(id), AgentType::Codex, "/tmp")
            .await
            .expect("spawn under the limit");
    }
    let error = manager
        .spawn(&WorkspaceId::from("c"), AgentType::Codex, "/tmp")
        .await
        .expect_err("third spawn must be rejected");

    assert!(matches!(error, BridgeError::CapacityExceeded { limit: 2 }));
    assert!(error.to_string().contains('2'));
    assert_eq!(mock.spawns(), 2);

    // An existing workspace is still served at capacity
    assert!(
        manager
            .spawn(&WorkspaceId::from("a"), AgentType::Codex, "/tmp")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_hard_ceiling_caps_soft_limit() {
    let mock = MockControlPlane::new();
    let manager = manager_with(&mock, ManagerConfig::builder().max_processes(999).build());
    assert_eq!(manager.effective_limit(), 5);

    for n in 0..5 {
        manager
            .spawn(&WorkspaceId::new(format!("ws-{n}")), AgentType::Codex, "/tmp")
            .await
            .expect("spawn under the ceiling");
    }
    let error = manager
        .spawn(&WorkspaceId::from("ws-5"), AgentType::Codex, "/tmp")
        .await
        .expect_err("sixth spawn must be rejected");

    assert!(matches!(error, BridgeError::CapacityExceeded { limit: 5 }));
    assert!(error.to_string().contains('5'));
}

#[tokio::test]
async fn test_failed_spawn_releases_capacity() {
    let mock = MockControlPlane::new();
    let manager = manager_with(&mock, ManagerConfig::builder().max_processes(1).build());
    let workspace = WorkspaceId::from("ws-1");

    mock.set_spawn_mode(SpawnMode::Fail("no such agent".to_string()));
    let error = manager
        .spawn(&workspace, AgentType::Codex, "/tmp")
        .await
        .expect_err("control plane failure");
    assert!(matches!(error, BridgeError::ControlPlane(_)));
    assert!(manager.is_empty());

    mock.set_spawn_mode(SpawnMode::Immediate);
    assert!(manager.spawn(&workspace, AgentType::Codex, "/tmp").await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_stalled_spawn_times_out() {
    let mock = MockControlPlane::new();
    let manager = manager_with(
        &mock,
        ManagerConfig::builder()
            .max_processes(1)
            .spawn_timeout(Duration::from_secs(2))
            .build(),
    );
    let workspace = WorkspaceId::from("ws-1");
    mock.set_spawn_mode(SpawnMode::Never);

    let started = tokio::time::Instant::now();
    let error = manager
        .spawn(&workspace, AgentType::ClaudeCode, "/tmp")
        .await
        .expect_err("stalled spawn must time out");

    assert!(matches!(error, BridgeError::Timeout(_)));
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(manager.get(&workspace).is_none());

    // The reservation was released, so the single slot is free again
    mock.set_spawn_mode(SpawnMode::Immediate);
    assert!(manager.spawn(&workspace, AgentType::ClaudeCode, "/tmp").await.is_ok());
}

#[tokio::test]
async fn test_kill_removes_entry_even_when_termination_fails() {
    let mock = MockControlPlane::new();
    let manager = manager(&mock);
    let workspace = WorkspaceId::from("ws-1");
    manager
        .spawn(&workspace, AgentType::Codex, "/tmp")
        .await
        .expect("spawn");

    mock.fail_kills(true);
    let result = manager.kill(&workspace).await;

    assert!(matches!(result, Err(BridgeError::ControlPlane(_))));
    assert!(manager.list().is_empty());
    assert_eq!(mock.kills(), 1);
}

#[tokio::test]
async fn test_kill_unknown_workspace_is_noop() {
    let mock = MockControlPlane::new();
    let manager = manager(&mock);

    assert!(manager.kill(&WorkspaceId::from("nobody")).await.is_ok());
    assert_eq!(mock.kills(), 0);
}

#[tokio::test]
async fn test_list_is_an_independent_snapshot() {
    let mock = MockControlPlane::new();
    let manager = manager(&mock);
    for id in ["b", "a"] {
        manager
            .spawn(&WorkspaceId::from(id), AgentType::OpenCode, "/tmp")
            .await
            .expect("spawn");
    }

    let mut snapshot = manager.list();
    let order: Vec<&str> = snapshot.iter().map(|p| p.workspace_id.as_str()).collect();
    assert_eq!(order, ["a", "b"]);

    snapshot[0].status = ProcessStatus::Exited;
    snapshot.clear();

    let fresh = manager.list();
    assert_eq!(fresh.len(), 2);
    assert!(fresh.iter().all(|p| p.status == ProcessStatus::Running));
}

#[tokio::test]
async fn test_status_poll_merges_reported_fields() {
    let mock = MockControlPlane::new();
    let manager = manager(&mock);
    let workspace = WorkspaceId::from("ws-1");
    let spawned = manager
        .spawn(&workspace, AgentType::ClaudeCode, "/tmp/project")
        .await
        .expect("spawn");

    mock.set_status_report(ProcessStatusReport {
        status: Some(ProcessStatus::Exited),
        last_exit_code: Some(137),
        crashed: Some(true),
        ..ProcessStatusReport::default()
    });
    let merged = manager
        .get_status(&workspace)
        .await
        .expect("cached process");

    assert_eq!(merged.status, ProcessStatus::Exited);
    assert_eq!(merged.last_exit_code, Some(137));
    assert!(merged.crashed);
    // Fields the report left out are untouched
    assert_eq!(merged.pid, spawned.pid);
    assert_eq!(merged.working_directory, spawned.working_directory);
    assert!(!merged.can_restart);
    assert_eq!(manager.get(&workspace), Some(merged));
}

#[tokio::test]
async fn test_status_poll_failure_falls_back_to_cache() {
    init_logging();
    let mock = MockControlPlane::new();
    let manager = manager(&mock);
    let workspace = WorkspaceId::from("ws-1");
    let spawned = manager
        .spawn(&workspace, AgentType::Codex, "/tmp")
        .await
        .expect("spawn");

    mock.fail_status_polls(2);
    assert!(matches!(
        manager.try_get_status(&workspace).await,
        Err(BridgeError::Timeout(_))
    ));
    assert_eq!(manager.get_status(&workspace).await, Some(spawned));
}

#[tokio::test]
async fn test_status_of_unknown_workspace() {
    let mock = MockControlPlane::new();
    let manager = manager(&mock);
    let workspace = WorkspaceId::from("missing");

    assert_eq!(manager.get_status(&workspace).await, None);
    assert!(matches!(manager.try_get_status(&workspace).await, Ok(None)));
    assert_eq!(mock.status_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_status_poll_retried_with_backoff() {
    let mock = MockControlPlane::new();
    let manager = manager(&mock);
    let workspace = WorkspaceId::from("ws-1");
    manager
        .spawn(&workspace, AgentType::Codex, "/tmp")
        .await
        .expect("spawn");
    mock.fail_status_polls(2);

    let options = RetryOptions::new()
        .should_retry(BridgeError::is_transient)
        .sleep(|_| -> BoxFuture<'static, ()> { Box::pin(async {}) });
    let process = retry_with_exponential_backoff(|| manager.try_get_status(&workspace), &options)
        .await
        .expect("third poll succeeds");

    assert!(process.is_some());
    assert_eq!(mock.status_calls.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_restart_requires_eligibility() {
    let mock = MockControlPlane::new();
    let manager = manager(&mock);
    let workspace = WorkspaceId::from("ws-1");

    assert!(matches!(
        manager.restart(&workspace).await,
        Err(BridgeError::ProcessNotFound(_))
    ));

    let original = manager
        .spawn(&workspace, AgentType::CursorAgent, "/tmp/project")
        .await
        .expect("spawn");
    assert!(matches!(
        manager.restart(&workspace).await,
        Err(BridgeError::RestartNotAllowed(_))
    ));
    assert_eq!(manager.get(&workspace), Some(original));
}

#[tokio::test]
async fn test_restart_respawns_with_same_settings() {
    let mock = MockControlPlane::new();
    let manager = manager(&mock);
    let workspace = WorkspaceId::from("ws-1");
    let original = manager
        .spawn(&workspace, AgentType::CursorAgent, "/tmp/project")
        .await
        .expect("spawn");

    mock.set_status_report(ProcessStatusReport {
        status: Some(ProcessStatus::Error),
        crashed: Some(true),
        can_restart: Some(true),
        ..ProcessStatusReport::default()
    });
    manager.get_status(&workspace).await;

    let restarted = manager.restart(&workspace).await.expect("restart");

    assert_ne!(restarted.id, original.id);
    assert_eq!(restarted.agent_type, AgentType::CursorAgent);
    assert_eq!(restarted.working_directory, original.working_directory);
    assert_eq!(restarted.status, ProcessStatus::Running);
    assert_eq!(mock.kills(), 1);
    assert_eq!(mock.spawns(), 2);
}

#[tokio::test]
async fn test_shutdown_kills_everything() {
    let mock = MockControlPlane::new();
    let manager = manager(&mock);
    for id in ["a", "b", "c"] {
        manager
            .spawn(&WorkspaceId::from(id), AgentType::Codex, "/tmp")
            .await
            .expect("spawn");
    }
    mock.fail_kills(true);

    manager.shutdown().await.expect("shutdown never fails");

    assert!(manager.is_empty());
    assert_eq!(mock.kills(), 3);
}
