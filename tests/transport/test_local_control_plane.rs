//! Integration tests for `LocalControlPlane`
//!
//! Uses `/bin/sh` and `/bin/sleep` as stand-in agents.

#![cfg(unix)]

use std::collections::HashMap;
use std::time::Duration;

use agent_bridge::{
    AgentType, BridgeError, BusEvent, BusEventKind, ControlPlane, EventBus, ExecuteRequest,
    KillRequest, LaunchCommand, LocalControlPlane, ProcessId, ProcessStatus, SessionId,
    SpawnRequest, StatusRequest, WorkspaceId,
};

fn shell_request(session_id: &SessionId, script: &str) -> ExecuteRequest {
    ExecuteRequest {
        session_id: session_id.clone(),
        agent_type: AgentType::Codex,
        program: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        working_directory: None,
        env: HashMap::new(),
        stdin: None,
    }
}

fn drain(subscription: &mut agent_bridge::Subscription) -> Vec<BusEvent> {
    let mut events = Vec::new();
    while let Some(event) = subscription.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_execute_streams_stdout_and_stderr() {
    let _ = env_logger::builder().is_test(true).try_init();
    let bus = EventBus::new();
    let control = LocalControlPlane::new(bus.clone());
    let session = SessionId::generate();
    let mut subscription = bus.subscribe_session(&session);

    let outcome = control
        .execute(shell_request(
            &session,
            r#"echo '{"type":"turn.completed"}'; echo 'not authenticated' >&2; exit 3"#,
        ))
        .await
        .expect("execute should run the program");

    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, Some(3));
    assert_eq!(outcome.stderr.as_deref().map(str::trim), Some("not authenticated"));

    let events = drain(&mut subscription);
    let stdout: String = events
        .iter()
        .filter(|event| event.kind == BusEventKind::Line)
        .map(|event| event.data.as_str())
        .collect();
    assert_eq!(stdout, "{\"type\":\"turn.completed\"}\n");
    assert!(events.iter().any(|event| event.kind == BusEventKind::Stderr));
    assert_eq!(events.last().map(|event| event.kind), Some(BusEventKind::Done));
}

#[tokio::test]
async fn test_execute_passes_stdin_env_and_cwd() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bus = EventBus::new();
    let control = LocalControlPlane::new(bus.clone());
    let session = SessionId::generate();
    let mut subscription = bus.subscribe_session(&session);

    let mut request = shell_request(&session, r#"read line; echo "$line $GREETING $(pwd)""#);
    request.stdin = Some("hello\n".to_string());
    request.env.insert("GREETING".to_string(), "world".to_string());
    request.working_directory = Some(dir.path().to_path_buf());

    let outcome = control.execute(request).await.expect("execute");
    assert!(outcome.success);
    assert_eq!(outcome.stderr, None);

    let line = drain(&mut subscription)
        .into_iter()
        .find(|event| event.kind == BusEventKind::Line)
        .expect("one line of output");
    let expected_dir = dir.path().canonicalize().expect("canonical tempdir");
    let printed = line.data.trim_end();
    assert!(printed.starts_with("hello world "));
    assert_eq!(
        std::path::Path::new(&printed["hello world ".len()..])
            .canonicalize()
            .expect("printed dir exists"),
        expected_dir
    );
}

#[tokio::test]
async fn test_execute_missing_program_publishes_error() {
    let bus = EventBus::new();
    let control = LocalControlPlane::new(bus.clone());
    let session = SessionId::generate();
    let mut subscription = bus.subscribe_session(&session);

    let mut request = shell_request(&session, "true");
    request.program = "/definitely/not/an/agent".to_string();
    let result = control.execute(request).await;

    assert!(matches!(result, Err(BridgeError::Process { .. })));
    let events = drain(&mut subscription);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, BusEventKind::Error);
}

#[tokio::test]
async fn test_spawn_status_kill_lifecycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let control = LocalControlPlane::new(EventBus::new())
        .with_launch_command(AgentType::Codex, LaunchCommand::new("/bin/sleep").arg("30"))
        .with_kill_grace(Duration::from_millis(100));
    let workspace = WorkspaceId::from("ws-1");

    let process = control
        .spawn(SpawnRequest {
            workspace_id: workspace.clone(),
            agent_type: AgentType::Codex,
            working_directory: dir.path().to_path_buf(),
        })
        .await
        .expect("spawn");
    assert_eq!(process.status, ProcessStatus::Running);
    assert!(process.pid > 0);
    assert_eq!(control.tracked_processes(), 1);

    let report = control
        .status(StatusRequest {
            workspace_id: workspace.clone(),
            process_id: process.id.clone(),
        })
        .await
        .expect("status");
    assert_eq!(report.status, Some(ProcessStatus::Running));

    let mismatch = control
        .status(StatusRequest {
            workspace_id: WorkspaceId::from("ws-2"),
            process_id: process.id.clone(),
        })
        .await;
    assert!(matches!(mismatch, Err(BridgeError::ControlPlane(_))));

    control
        .kill(KillRequest {
            workspace_id: workspace.clone(),
            process_id: process.id.clone(),
        })
        .await
        .expect("kill");
    assert_eq!(control.tracked_processes(), 0);

    let report = control
        .status(StatusRequest {
            workspace_id: workspace,
            process_id: process.id,
        })
        .await
        .expect("status after kill");
    assert_eq!(report.status, Some(ProcessStatus::Exited));
}

#[tokio::test]
async fn test_crashed_process_is_restartable() {
    let control = LocalControlPlane::new(EventBus::new())
        .with_launch_command(AgentType::OpenCode, LaunchCommand::new("/bin/sh").arg("-c").arg("exit 7"));
    let workspace = WorkspaceId::from("ws-1");

    let process = control
        .spawn(SpawnRequest {
            workspace_id: workspace.clone(),
            agent_type: AgentType::OpenCode,
            working_directory: std::env::temp_dir(),
        })
        .await
        .expect("spawn");

    let request = StatusRequest {
        workspace_id: workspace,
        process_id: process.id,
    };
    let mut report = control.status(request.clone()).await.expect("status");
    for _ in 0..100 {
        if report.status != Some(ProcessStatus::Running) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        report = control.status(request.clone()).await.expect("status");
    }

    assert_eq!(report.status, Some(ProcessStatus::Error));
    assert_eq!(report.last_exit_code, Some(7));
    assert_eq!(report.crashed, Some(true));
    assert_eq!(report.can_restart, Some(true));
}

#[tokio::test]
async fn test_spawn_without_launch_command() {
    let control = LocalControlPlane::new(EventBus::new());

    let result = control
        .spawn(SpawnRequest {
            workspace_id: WorkspaceId::from("ws-1"),
            agent_type: AgentType::ClaudeCode,
            working_directory: std::env::temp_dir(),
        })
        .await;

    assert!(matches!(result, Err(BridgeError::ControlPlane(_))));
}

#[tokio::test]
async fn test_kill_unknown_process_is_ok() {
    let control = LocalControlPlane::new(EventBus::new());

    let result = control
        .kill(KillRequest {
            workspace_id: WorkspaceId::from("ws-1"),
            process_id: ProcessId::new("missing"),
        })
        .await;

    assert!(result.is_ok());
}
