//! Protocol adapters, one per supported agent CLI
//!
//! Each adapter knows how to launch its agent and how to turn one decoded
//! line of the agent's streaming output into at most one [`StreamEvent`].
//! The mapping is a pure function, so every adapter can be tested without
//! spawning anything; [`run_session`] supplies the shared I/O plumbing.
//!
//! - [`claude_code`] - assistant-message-block protocol
//! - [`cursor_agent`] - envelope protocol with single-key tool objects
//! - [`opencode`] - flat envelopes carrying a nested `part`
//! - [`codex`] - item-lifecycle protocol

pub mod claude_code;
pub mod codex;
pub mod cursor_agent;
pub mod opencode;

pub use claude_code::ClaudeCodeAdapter;
pub use codex::CodexAdapter;
pub use cursor_agent::CursorAgentAdapter;
pub use opencode::OpenCodeAdapter;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::control::{AgentContext, ExecuteRequest};
use crate::error::Result;
use crate::stream::{SendOutcome, Transcript, parse_json_line, run_session};
use crate::types::agent::{AgentStatus, ChatMessage, Role};
use crate::types::events::StreamEvent;
use crate::types::identifiers::SessionId;
use crate::types::options::SendOptions;
use crate::types::process::AgentType;

/// Translates one agent's CLI protocol into normalized events
pub trait AgentAdapter: Send + Sync {
    /// Agent kind this adapter drives
    fn agent_type(&self) -> AgentType;

    /// Human-readable name used in diagnostics ("Claude Code", ...)
    fn source_label(&self) -> &'static str;

    /// Build the control-plane request for one send
    fn build_request(
        &self,
        session_id: &SessionId,
        history: &[ChatMessage],
        options: &SendOptions,
    ) -> ExecuteRequest;

    /// Map one decoded line to at most one event
    ///
    /// Must be pure: the same value always maps to the same result.
    fn map_event(&self, value: &Value) -> Option<StreamEvent>;

    /// Map one raw line to at most one event
    ///
    /// Never fails: blank lines map to `None` and malformed JSON maps to an
    /// `Error` diagnostic.
    fn parse_output(&self, line: &str) -> Option<StreamEvent> {
        let parsed = parse_json_line(line, self.source_label());
        if parsed.error_event.is_some() {
            return parsed.error_event;
        }
        parsed.value.as_ref().and_then(|value| self.map_event(value))
    }

    /// Whether `finalize` reads [`Transcript::lines`]
    ///
    /// Raw lines are only kept for the whole session when this is `true`.
    fn retains_lines(&self) -> bool {
        false
    }

    /// Decide the final text of a completed send
    fn finalize(&self, transcript: &Transcript) -> String {
        transcript.text.clone()
    }

    /// Drive one send end-to-end, reporting every event to `on_stream`
    fn send_message<'a>(
        &'a self,
        ctx: &'a AgentContext,
        history: &'a [ChatMessage],
        options: SendOptions,
        on_stream: &'a mut (dyn FnMut(StreamEvent) + Send),
    ) -> BoxFuture<'a, Result<SendOutcome>> {
        Box::pin(run_session(ctx, self, history, options, on_stream))
    }

    /// Probe installation/authentication and record the result in the
    /// context's status map
    fn check_status<'a>(&'a self, ctx: &'a AgentContext) -> BoxFuture<'a, Result<AgentStatus>> {
        let agent_type = self.agent_type();
        Box::pin(async move {
            let status = ctx.control().check_agent(agent_type).await?;
            ctx.statuses().set(status.clone());
            Ok(status)
        })
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Flatten a conversation into a single prompt
///
/// A lone user message is passed through as-is; longer histories become a
/// `User:` / `Assistant:` transcript preceded by any system messages.
pub(crate) fn render_prompt(history: &[ChatMessage]) -> String {
    if let [only] = history
        && only.role == Role::User
    {
        return only.content.clone();
    }

    let mut sections = Vec::with_capacity(history.len());
    for message in history.iter().filter(|m| m.role == Role::System) {
        sections.push(message.content.clone());
    }
    for message in history.iter().filter(|m| m.role != Role::System) {
        let speaker = match message.role {
            Role::User => "User",
            _ => "Assistant",
        };
        sections.push(format!("{speaker}: {}", message.content));
    }
    sections.join("\n\n")
}

/// Common tail of every request: model flag, extra args, options plumbing
pub(crate) fn base_request(
    agent_type: AgentType,
    session_id: &SessionId,
    args: Vec<String>,
    options: &SendOptions,
) -> ExecuteRequest {
    ExecuteRequest {
        session_id: session_id.clone(),
        agent_type,
        program: agent_type.binary().to_string(),
        args,
        working_directory: options.working_directory.clone(),
        env: options.env.clone(),
        stdin: None,
    }
}

pub(crate) fn str_field<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    value.get(key).and_then(Value::as_str)
}

/// `Some(text)` unless the text is empty
pub(crate) fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Render a tool result payload as text
///
/// Strings pass through, content-block arrays contribute their `text`
/// parts, anything else is rendered as compact JSON.
pub(crate) fn stringify_content(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text.clone()),
                    Value::Object(_) => str_field(item, "text").map(str::to_string),
                    _ => None,
                })
                .collect();
            if parts.is_empty() && !items.is_empty() {
                value.to_string()
            } else {
                parts.join("\n")
            }
        }
        Value::Object(_) => match (str_field(value, "text"), value.get("content")) {
            (Some(text), _) => text.to_string(),
            (None, Some(content)) => stringify_content(content),
            (None, None) => value.to_string(),
        },
        other => other.to_string(),
    }
}

/// Extract a human-readable message from an `error` field of any shape
pub(crate) fn error_message(error: &Value) -> Option<String> {
    match error {
        Value::String(text) => non_empty(text),
        Value::Object(_) => str_field(error, "message")
            .or_else(|| error.pointer("/data/message").and_then(Value::as_str))
            .or_else(|| str_field(error, "errorMessage"))
            .map(str::to_string)
            .or_else(|| Some(error.to_string())),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
