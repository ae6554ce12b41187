//! Codex adapter
//!
//! Runs `codex exec --json`, whose output follows an item lifecycle: every
//! unit of work is announced with `item.started` and settled with
//! `item.completed`, and the turn ends with `turn.completed`.

use serde_json::{Value, json};

use super::{AgentAdapter, base_request, error_message, non_empty, render_prompt, str_field};
use crate::control::ExecuteRequest;
use crate::types::agent::ChatMessage;
use crate::types::events::StreamEvent;
use crate::types::identifiers::SessionId;
use crate::types::options::SendOptions;
use crate::types::process::AgentType;

/// Tool name reported for shell commands Codex runs
pub const COMMAND_TOOL_NAME: &str = "command_execution";

/// Adapter for the Codex CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct CodexAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Started,
    Completed,
}

impl AgentAdapter for CodexAdapter {
    fn agent_type(&self) -> AgentType {
        AgentType::Codex
    }

    fn source_label(&self) -> &'static str {
        "Codex"
    }

    fn build_request(
        &self,
        session_id: &SessionId,
        history: &[ChatMessage],
        options: &SendOptions,
    ) -> ExecuteRequest {
        let mut args: Vec<String> = ["exec", "--json", "--skip-git-repo-check"]
            .into_iter()
            .map(String::from)
            .collect();

        if let Some(model) = &options.model {
            args.push("-m".to_string());
            args.push(model.clone());
        }
        args.extend(options.extra_args.iter().cloned());
        args.push(render_prompt(history));

        base_request(self.agent_type(), session_id, args, options)
    }

    fn map_event(&self, value: &Value) -> Option<StreamEvent> {
        match str_field(value, "type")? {
            "turn.completed" => Some(StreamEvent::Done),
            "turn.failed" => Some(StreamEvent::error(
                value
                    .get("error")
                    .and_then(error_message)
                    .unwrap_or_else(|| "Codex turn failed".to_string()),
            )),
            "error" => Some(StreamEvent::error(
                str_field(value, "message")
                    .map(str::to_string)
                    .or_else(|| value.get("error").and_then(error_message))
                    .unwrap_or_else(|| "Codex reported an error".to_string()),
            )),
            "item.started" => map_item(value.get("item")?, Phase::Started),
            "item.completed" => map_item(value.get("item")?, Phase::Completed),
            _ => None,
        }
    }
}

fn map_item(item: &Value, phase: Phase) -> Option<StreamEvent> {
    let item_id = str_field(item, "id").unwrap_or_default();

    match (str_field(item, "type")?, phase) {
        ("agent_message", Phase::Completed) => str_field(item, "text")
            .and_then(non_empty)
            .map(StreamEvent::text),
        ("reasoning", _) => str_field(item, "text")
            .and_then(non_empty)
            .map(StreamEvent::thinking),
        ("command_execution", Phase::Started) => Some(StreamEvent::tool_use(
            item_id,
            COMMAND_TOOL_NAME,
            json!({ "command": item.get("command").cloned().unwrap_or(Value::Null) }),
        )),
        ("command_execution", Phase::Completed) => Some(StreamEvent::tool_result(
            item_id,
            str_field(item, "aggregated_output").unwrap_or_default(),
        )),
        _ => None,
    }
}
