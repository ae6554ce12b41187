//! Unit tests for the safe JSON line parser

use agent_bridge::{StreamEvent, parse_json_line};
use serde_json::json;

#[test]
fn test_blank_input_yields_nothing() {
    for line in ["", "   ", "\t\r"] {
        let parsed = parse_json_line(line, "Codex");
        assert_eq!(parsed.value, None);
        assert_eq!(parsed.error_event, None);
    }
}

#[test]
fn test_parses_object() {
    let parsed = parse_json_line(r#"{"type":"turn.completed"}"#, "Codex");
    assert_eq!(parsed.value, Some(json!({"type": "turn.completed"})));
    assert_eq!(parsed.error_event, None);
}

#[test]
fn test_unwraps_double_encoded_payload() {
    let line = serde_json::to_string(r#"{"type":"text","text":"hi"}"#).unwrap();
    let parsed = parse_json_line(&line, "OpenCode");
    assert_eq!(parsed.value, Some(json!({"type": "text", "text": "hi"})));
}

#[test]
fn test_keeps_first_pass_when_unwrap_fails() {
    let line = serde_json::to_string("{not really json}").unwrap();
    let parsed = parse_json_line(&line, "OpenCode");
    assert_eq!(parsed.value, Some(json!("{not really json}")));
    assert_eq!(parsed.error_event, None);
}

#[test]
fn test_plain_string_is_not_unwrapped() {
    let parsed = parse_json_line(r#""hello""#, "Codex");
    assert_eq!(parsed.value, Some(json!("hello")));
}

#[test]
fn test_malformed_line_reports_error_event() {
    let _ = env_logger::builder().is_test(true).try_init();

    let parsed = parse_json_line("{\"type\": ", "Claude Code");
    assert_eq!(parsed.value, None);
    assert_eq!(
        parsed.error_event,
        Some(StreamEvent::error("Claude Code stream emitted malformed JSON"))
    );
}

#[test]
fn test_never_panics_on_arbitrary_input() {
    let inputs = ["}", "[", "\u{0}", "nul", "{\"a\":\"\\ud800\"}", "🙂", "[1,2"];
    for input in inputs {
        let _ = parse_json_line(input, "Cursor Agent");
    }
}
