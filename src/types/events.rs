//! Normalized stream event types
//!
//! Every adapter decodes its agent's wire format into [`StreamEvent`] at the
//! boundary. Nothing agent-specific travels past this type.

use serde::{Deserialize, Serialize};

/// The agent-agnostic unit of streamed output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental assistant text
    Text {
        /// Text content
        content: String,
    },
    /// Incremental reasoning/thinking text
    Thinking {
        /// Thinking content
        content: String,
    },
    /// The agent started a tool invocation
    ToolUse {
        /// Tool call id, used to pair with the result
        tool_id: String,
        /// Tool name
        tool_name: String,
        /// Tool input parameters
        input: serde_json::Value,
    },
    /// A tool invocation finished
    ToolResult {
        /// Tool call id this result belongs to
        tool_id: String,
        /// Result rendered as text
        result: String,
    },
    /// Error notice (malformed data, agent-reported failure)
    Error {
        /// Human-readable message
        message: String,
    },
    /// The exchange finished
    Done,
}

impl StreamEvent {
    /// Create a text event
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Create a thinking event
    pub fn thinking(content: impl Into<String>) -> Self {
        Self::Thinking {
            content: content.into(),
        }
    }

    /// Create a tool use event
    pub fn tool_use(
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self::ToolUse {
            tool_id: tool_id.into(),
            tool_name: tool_name.into(),
            input,
        }
    }

    /// Create a tool result event
    pub fn tool_result(tool_id: impl Into<String>, result: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_id: tool_id.into(),
            result: result.into(),
        }
    }

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether this event ends the exchange
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}
