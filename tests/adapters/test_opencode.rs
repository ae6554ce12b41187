//! Unit tests for the OpenCode adapter

use agent_bridge::{AgentAdapter, ChatMessage, OpenCodeAdapter, SendOptions, SessionId, StreamEvent};
use serde_json::json;

fn parse(line: &str) -> Option<StreamEvent> {
    OpenCodeAdapter.parse_output(line)
}

#[test]
fn test_empty_line_maps_to_none() {
    assert_eq!(parse(""), None);
    assert_eq!(parse("  \r"), None);
}

#[test]
fn test_text_and_reasoning_parts() {
    assert_eq!(
        parse(r#"{"type":"message.part.updated","part":{"type":"text","text":"Hi"}}"#),
        Some(StreamEvent::text("Hi"))
    );
    assert_eq!(
        parse(r#"{"type":"message.part.updated","part":{"type":"reasoning","text":"weighing"}}"#),
        Some(StreamEvent::thinking("weighing"))
    );
    assert_eq!(
        parse(r#"{"type":"message.part.updated","part":{"type":"step-start"}}"#),
        None
    );
}

#[test]
fn test_tool_lifecycle() {
    let running = json!({
        "type": "message.part.updated",
        "part": {"type": "tool", "callID": "t1", "tool": "bash", "state": {"status": "running", "input": {"command": "ls"}}}
    })
    .to_string();
    assert_eq!(
        parse(&running),
        Some(StreamEvent::tool_use("t1", "bash", json!({"command": "ls"})))
    );

    let completed = json!({
        "type": "message.part.updated",
        "part": {"type": "tool", "callID": "t1", "tool": "bash", "state": {"status": "completed", "output": "Cargo.toml\nsrc"}}
    })
    .to_string();
    assert_eq!(
        parse(&completed),
        Some(StreamEvent::tool_result("t1", "Cargo.toml\nsrc"))
    );
}

#[test]
fn test_tool_error_becomes_result() {
    let line = json!({
        "part": {"type": "tool", "id": "t2", "tool": "edit", "state": {"status": "error", "error": "file not found"}}
    })
    .to_string();
    assert_eq!(
        parse(&line),
        Some(StreamEvent::tool_result("t2", "Error: file not found"))
    );
}

#[test]
fn test_error_field_wins() {
    assert_eq!(
        parse(r#"{"type":"session.error","error":{"name":"ProviderAuthError","data":{"message":"no key"}}}"#),
        Some(StreamEvent::error("no key"))
    );
    assert_eq!(
        parse(r#"{"type":"error","message":"boom"}"#),
        Some(StreamEvent::error("boom"))
    );
    // A null error field is not an error
    assert_eq!(
        parse(r#"{"error":null,"part":{"type":"text","text":"ok"}}"#),
        Some(StreamEvent::text("ok"))
    );
}

#[test]
fn test_legacy_result_shape() {
    let line = json!({
        "jsonrpc": "2.0",
        "result": {"message": {"parts": [
            {"type": "text", "text": "Hello, "},
            {"type": "tool", "tool": "read"},
            {"type": "text", "text": "world"}
        ]}}
    })
    .to_string();
    assert_eq!(parse(&line), Some(StreamEvent::text("Hello, world")));
}

#[test]
fn test_build_request() {
    let options = SendOptions::builder()
        .model("anthropic/claude-sonnet-4")
        .extra_arg("--print-logs")
        .build();
    let request =
        OpenCodeAdapter.build_request(&SessionId::new("s"), &[ChatMessage::user("hi")], &options);

    assert_eq!(request.program, "opencode");
    assert_eq!(
        request.args,
        [
            "run",
            "--format",
            "json",
            "--model",
            "anthropic/claude-sonnet-4",
            "--print-logs",
            "hi"
        ]
    );
}
