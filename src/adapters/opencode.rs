//! OpenCode adapter
//!
//! Runs `opencode run --format json`. Each line is a flat envelope whose
//! `part` describes the content:
//!
//! ```json
//! {"type":"message.part.updated","part":{"type":"text","text":"Hi"}}
//! {"type":"message.part.updated","part":{"type":"tool","callID":"t1","tool":"bash",
//!   "state":{"status":"completed","output":"ok"}}}
//! ```
//!
//! Older builds answer with a single JSON-RPC style payload carrying
//! `result.message.parts`; that shape is still understood.

use serde_json::{Value, json};

use super::{
    AgentAdapter, base_request, error_message, non_empty, render_prompt, str_field,
    stringify_content,
};
use crate::control::ExecuteRequest;
use crate::types::agent::ChatMessage;
use crate::types::events::StreamEvent;
use crate::types::identifiers::SessionId;
use crate::types::options::SendOptions;
use crate::types::process::AgentType;

/// Adapter for the OpenCode CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCodeAdapter;

impl AgentAdapter for OpenCodeAdapter {
    fn agent_type(&self) -> AgentType {
        AgentType::OpenCode
    }

    fn source_label(&self) -> &'static str {
        "OpenCode"
    }

    fn build_request(
        &self,
        session_id: &SessionId,
        history: &[ChatMessage],
        options: &SendOptions,
    ) -> ExecuteRequest {
        let mut args: Vec<String> = ["run", "--format", "json"]
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
        if let Some(error) = value.get("error").filter(|error| !error.is_null()) {
            return Some(StreamEvent::error(
                error_message(error).unwrap_or_else(|| "OpenCode reported an error".to_string()),
            ));
        }

        if let Some(part) = value.get("part") {
            return map_part(part);
        }

        if let Some(parts) = value.pointer("/result/message/parts").and_then(Value::as_array) {
            let text: String = parts
                .iter()
                .filter(|part| str_field(part, "type") == Some("text"))
                .filter_map(|part| str_field(part, "text"))
                .collect();
            return non_empty(&text).map(StreamEvent::text);
        }

        match str_field(value, "type") {
            Some("error") => Some(StreamEvent::error(
                str_field(value, "message")
                    .and_then(non_empty)
                    .unwrap_or_else(|| "OpenCode reported an error".to_string()),
            )),
            _ => None,
        }
    }
}

fn map_part(part: &Value) -> Option<StreamEvent> {
    match str_field(part, "type")? {
        "text" => str_field(part, "text")
            .and_then(non_empty)
            .map(StreamEvent::text),
        "reasoning" | "thinking" => str_field(part, "text")
            .and_then(non_empty)
            .map(StreamEvent::thinking),
        "tool" => Some(map_tool(part)),
        _ => None,
    }
}

fn map_tool(part: &Value) -> StreamEvent {
    let tool_id = str_field(part, "callID")
        .or_else(|| str_field(part, "call_id"))
        .or_else(|| str_field(part, "id"))
        .unwrap_or_default();
    let state = part.get("state");
    let status = state.and_then(|state| str_field(state, "status"));

    match status {
        Some("completed") => StreamEvent::tool_result(
            tool_id,
            state
                .and_then(|state| state.get("output"))
                .map(stringify_content)
                .unwrap_or_default(),
        ),
        Some("error") => {
            let message = state
                .and_then(|state| state.get("error"))
                .and_then(error_message)
                .unwrap_or_else(|| "tool failed".to_string());
            StreamEvent::tool_result(tool_id, format!("Error: {message}"))
        }
        // pending / running
        _ => StreamEvent::tool_use(
            tool_id,
            str_field(part, "tool").unwrap_or("tool"),
            state
                .and_then(|state| state.get("input"))
                .cloned()
                .unwrap_or_else(|| json!({})),
        ),
    }
}
