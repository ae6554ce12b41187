//! Cursor Agent adapter
//!
//! Runs `cursor-agent --print --output-format stream-json`. Events are
//! envelopes keyed by `type`; tool calls nest the tool's name and arguments
//! one level under a single dynamically-named key:
//!
//! ```json
//! {"type":"tool_call","subtype":"started","call_id":"c1",
//!  "tool_call":{"readToolCall":{"args":{"path":"src/main.rs"}}}}
//! ```
//!
//! Cursor Agent occasionally produces output that does not decode cleanly.
//! When structured decoding yields no text at all, [`finalize`] falls back
//! to pattern-matching `result` / `text` fields out of the raw lines. That
//! path is a degraded best effort, not part of the protocol.
//!
//! [`finalize`]: AgentAdapter::finalize

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value, json};

use super::{
    AgentAdapter, base_request, error_message, non_empty, render_prompt, str_field,
    stringify_content,
};
use crate::control::ExecuteRequest;
use crate::stream::Transcript;
use crate::types::agent::ChatMessage;
use crate::types::events::StreamEvent;
use crate::types::identifiers::SessionId;
use crate::types::options::SendOptions;
use crate::types::process::AgentType;

/// Returned when neither structured nor fallback extraction finds any text
pub const NO_RESPONSE_MESSAGE: &str =
    "I'm sorry, but I couldn't read a response from Cursor Agent. Please try again.";

/// Adapter for the Cursor Agent CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorAgentAdapter;

impl AgentAdapter for CursorAgentAdapter {
    fn agent_type(&self) -> AgentType {
        AgentType::CursorAgent
    }

    fn source_label(&self) -> &'static str {
        "Cursor Agent"
    }

    fn build_request(
        &self,
        session_id: &SessionId,
        history: &[ChatMessage],
        options: &SendOptions,
    ) -> ExecuteRequest {
        let mut args: Vec<String> = ["--print", "--output-format", "stream-json"]
            .into_iter()
            .map(String::from)
            .collect();

        if let Some(model) = &options.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        args.extend(options.extra_args.iter().cloned());
        args.push(render_prompt(history));

        base_request(self.agent_type(), session_id, args, options)
    }

    fn map_event(&self, value: &Value) -> Option<StreamEvent> {
        match str_field(value, "type")? {
            "system" | "user" => None,
            "thinking" => {
                if str_field(value, "subtype") != Some("delta") {
                    return None;
                }
                str_field(value, "text")
                    .and_then(non_empty)
                    .map(StreamEvent::thinking)
            }
            "assistant" => assistant_text(value).map(StreamEvent::text),
            "tool_call" => map_tool_call(value),
            "result" => {
                if value.get("is_error").and_then(Value::as_bool) == Some(true) {
                    Some(StreamEvent::error(
                        str_field(value, "result")
                            .and_then(non_empty)
                            .unwrap_or_else(|| "Cursor Agent reported an error".to_string()),
                    ))
                } else {
                    Some(StreamEvent::Done)
                }
            }
            "error" => Some(StreamEvent::error(
                str_field(value, "message")
                    .map(str::to_string)
                    .or_else(|| value.get("error").and_then(error_message))
                    .unwrap_or_else(|| "Cursor Agent reported an error".to_string()),
            )),
            _ => None,
        }
    }

    fn retains_lines(&self) -> bool {
        true
    }

    fn finalize(&self, transcript: &Transcript) -> String {
        if !transcript.text.trim().is_empty() {
            return transcript.text.clone();
        }

        if let Some(result) = structured_result(&transcript.lines) {
            return result;
        }

        let raw = transcript.lines.join("\n");
        match fallback_extract(&raw) {
            Some(text) => {
                log::warn!("Cursor Agent output recovered through fallback extraction");
                text
            }
            None => {
                log::warn!("Cursor Agent output contained no extractable text");
                NO_RESPONSE_MESSAGE.to_string()
            }
        }
    }
}

fn assistant_text(value: &Value) -> Option<String> {
    let content = value.pointer("/message/content")?;
    let text = match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter(|part| str_field(part, "type") == Some("text"))
            .filter_map(|part| str_field(part, "text"))
            .collect::<String>(),
        _ => return None,
    };
    non_empty(&text)
}

fn map_tool_call(value: &Value) -> Option<StreamEvent> {
    let call_id = str_field(value, "call_id").unwrap_or_default();
    let (key, inner) = tool_entry(value.get("tool_call")?.as_object()?)?;

    match str_field(value, "subtype")? {
        "started" => Some(StreamEvent::tool_use(
            call_id,
            tool_name(key, inner),
            tool_input(inner),
        )),
        "completed" => Some(StreamEvent::tool_result(
            call_id,
            inner.get("result").map(tool_outcome).unwrap_or_default(),
        )),
        _ => None,
    }
}

/// The entry describing the call, not the alphabetically first key
fn tool_entry(calls: &Map<String, Value>) -> Option<(&String, &Value)> {
    calls
        .iter()
        .find(|(_, inner)| {
            ["args", "arguments", "result"]
                .iter()
                .any(|field| inner.get(field).is_some())
        })
        .or_else(|| calls.iter().find(|(_, inner)| inner.is_object()))
}

/// `{"function":{"name":"grep"}}` names itself; `readToolCall` becomes `read`
fn tool_name(key: &str, inner: &Value) -> String {
    if let Some(name) = str_field(inner, "name") {
        return name.to_string();
    }
    key.strip_suffix("ToolCall").unwrap_or(key).to_string()
}

fn tool_input(inner: &Value) -> Value {
    if let Some(args) = inner.get("args") {
        return args.clone();
    }
    match inner.get("arguments") {
        Some(Value::String(encoded)) => serde_json::from_str(encoded)
            .unwrap_or_else(|_| Value::String(encoded.clone())),
        Some(arguments) => arguments.clone(),
        None => Value::Object(Map::new()),
    }
}

fn tool_outcome(result: &Value) -> String {
    if let Some(success) = result.get("success") {
        let payload = success
            .get("content")
            .or_else(|| success.get("output"))
            .or_else(|| success.get("stdout"))
            .unwrap_or(success);
        return stringify_content(payload);
    }
    if let Some(error) = result.get("error") {
        let message = error_message(error).unwrap_or_else(|| json!(error).to_string());
        return format!("Error: {message}");
    }
    stringify_content(result)
}

fn structured_result(lines: &[String]) -> Option<String> {
    lines
        .iter()
        .rev()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .find(|value| str_field(value, "type") == Some("result"))
        .and_then(|value| str_field(&value, "result").and_then(non_empty))
}

// ============================================================================
// Degraded path: pattern extraction from raw output
// ============================================================================

fn result_field_regex() -> Option<&'static Regex> {
    static CACHED: OnceLock<Option<Regex>> = OnceLock::new();
    CACHED
        .get_or_init(|| Regex::new(r#""result"\s*:\s*"((?:[^"\\]|\\.)*)""#).ok())
        .as_ref()
}

fn text_field_regex() -> Option<&'static Regex> {
    static CACHED: OnceLock<Option<Regex>> = OnceLock::new();
    CACHED
        .get_or_init(|| Regex::new(r#""text"\s*:\s*"((?:[^"\\]|\\.)*)""#).ok())
        .as_ref()
}

/// Pull a `result` field, else the concatenated `text` fields, out of raw output
pub(crate) fn fallback_extract(raw: &str) -> Option<String> {
    if let Some(captures) = result_field_regex().and_then(|re| re.captures_iter(raw).last()) {
        let text = unescape_json_string(captures.get(1)?.as_str());
        if !text.trim().is_empty() {
            return Some(text);
        }
    }

    let text: String = text_field_regex()?
        .captures_iter(raw)
        .filter_map(|captures| captures.get(1))
        .map(|capture| unescape_json_string(capture.as_str()))
        .collect();
    if text.trim().is_empty() { None } else { Some(text) }
}

/// Undo JSON string escapes; malformed escapes are kept literally
pub(crate) fn unescape_json_string(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(|code| decode_code_unit(code, &mut chars));
                match decoded {
                    Some(ch) => out.push(ch),
                    None => out.push(char::REPLACEMENT_CHARACTER),
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

fn decode_code_unit(
    code: u32,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Option<char> {
    if !(0xD800..0xDC00).contains(&code) {
        return char::from_u32(code);
    }

    // High surrogate: expect a `\uXXXX` low surrogate right after
    if chars.peek() != Some(&'\\') {
        return None;
    }
    chars.next();
    if chars.next() != Some('u') {
        return None;
    }
    let hex: String = chars.by_ref().take(4).collect();
    let low = u32::from_str_radix(&hex, 16).ok()?;
    if !(0xDC00..0xE000).contains(&low) {
        return None;
    }
    char::from_u32(0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00))
}
