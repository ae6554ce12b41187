//! Claude Code adapter
//!
//! Runs `claude --print --output-format stream-json --include-partial-messages`
//! and maps its assistant-message-block protocol:
//!
//! - `content_block_delta` carries incremental text and thinking
//! - `content_block_start` opens thinking blocks
//! - full `assistant` messages carry completed tool-use blocks
//! - `tool_result` and `user` echoes carry tool output
//! - `result` ends the exchange
//!
//! A tool-use block opens with an empty `input` that is then streamed as
//! `input_json_delta` fragments, so tool calls are taken from the completed
//! `assistant` message instead. Text and thinking in `assistant` messages
//! repeat what the deltas already streamed and are dropped. Partial-message
//! events may arrive wrapped in a `stream_event` envelope, which is
//! unwrapped first.

use serde_json::{Value, json};

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

/// Adapter for the Claude Code CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeCodeAdapter;

impl AgentAdapter for ClaudeCodeAdapter {
    fn agent_type(&self) -> AgentType {
        AgentType::ClaudeCode
    }

    fn source_label(&self) -> &'static str {
        "Claude Code"
    }

    fn build_request(
        &self,
        session_id: &SessionId,
        history: &[ChatMessage],
        options: &SendOptions,
    ) -> ExecuteRequest {
        let mut args: Vec<String> = [
            "--print",
            "--output-format",
            "stream-json",
            "--verbose",
            "--include-partial-messages",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        if let Some(model) = &options.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        args.extend(options.extra_args.iter().cloned());
        args.push("--".to_string());
        args.push(render_prompt(history));

        base_request(self.agent_type(), session_id, args, options)
    }

    fn map_event(&self, value: &Value) -> Option<StreamEvent> {
        match str_field(value, "type")? {
            "stream_event" => value.get("event").and_then(|event| self.map_event(event)),
            "content_block_delta" => map_delta(value.get("delta")?),
            "content_block_start" => map_block_start(value.get("content_block")?),
            "tool_result" => Some(StreamEvent::tool_result(
                str_field(value, "tool_use_id").unwrap_or_default(),
                value.get("content").map(stringify_content).unwrap_or_default(),
            )),
            "assistant" => map_assistant_tool_use(value),
            "user" => map_user_echo(value),
            "result" => Some(map_result(value)),
            "error" => Some(StreamEvent::error(
                value
                    .get("error")
                    .and_then(error_message)
                    .or_else(|| str_field(value, "message").map(str::to_string))
                    .unwrap_or_else(|| "Claude Code reported an error".to_string()),
            )),
            // `system` and message framing events carry nothing to surface
            _ => None,
        }
    }

    fn retains_lines(&self) -> bool {
        true
    }

    fn finalize(&self, transcript: &Transcript) -> String {
        if !transcript.text.is_empty() {
            return transcript.text.clone();
        }

        transcript
            .lines
            .iter()
            .rev()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .find(|value| str_field(value, "type") == Some("result"))
            .and_then(|value| str_field(&value, "result").map(str::to_string))
            .unwrap_or_default()
    }
}

fn map_delta(delta: &Value) -> Option<StreamEvent> {
    match str_field(delta, "type") {
        Some("text_delta") => str_field(delta, "text")
            .and_then(non_empty)
            .map(StreamEvent::text),
        Some("thinking_delta") => str_field(delta, "thinking")
            .and_then(non_empty)
            .map(StreamEvent::thinking),
        _ => {
            if let Some(text) = str_field(delta, "text") {
                non_empty(text).map(StreamEvent::text)
            } else {
                str_field(delta, "thinking")
                    .and_then(non_empty)
                    .map(StreamEvent::thinking)
            }
        }
    }
}

fn map_block_start(block: &Value) -> Option<StreamEvent> {
    match str_field(block, "type")? {
        "thinking" => str_field(block, "thinking")
            .and_then(non_empty)
            .map(StreamEvent::thinking),
        _ => None,
    }
}

/// Claude Code emits one `assistant` message per completed content block
fn map_assistant_tool_use(value: &Value) -> Option<StreamEvent> {
    let blocks = value.pointer("/message/content")?.as_array()?;
    let block = blocks.iter().find(|block| {
        matches!(str_field(block, "type"), Some("tool_use" | "server_tool_use"))
    })?;

    Some(StreamEvent::tool_use(
        str_field(block, "id").unwrap_or_default(),
        str_field(block, "name").unwrap_or("tool"),
        block.get("input").cloned().unwrap_or_else(|| json!({})),
    ))
}

fn map_user_echo(value: &Value) -> Option<StreamEvent> {
    let blocks = value.pointer("/message/content")?.as_array()?;
    let block = blocks
        .iter()
        .find(|block| str_field(block, "type") == Some("tool_result"))?;

    Some(StreamEvent::tool_result(
        str_field(block, "tool_use_id").unwrap_or_default(),
        block.get("content").map(stringify_content).unwrap_or_default(),
    ))
}

fn map_result(value: &Value) -> StreamEvent {
    let is_error = value
        .get("is_error")
        .and_then(Value::as_bool)
        .unwrap_or(false)
        || str_field(value, "subtype").is_some_and(|subtype| subtype.starts_with("error"));

    if !is_error {
        return StreamEvent::Done;
    }

    let message = str_field(value, "result")
        .and_then(non_empty)
        .or_else(|| str_field(value, "subtype").map(|subtype| format!("Claude Code ended with {subtype}")))
        .unwrap_or_else(|| "Claude Code reported an error".to_string());
    StreamEvent::error(message)
}
