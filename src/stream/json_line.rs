//! Non-throwing JSON decoding for single output lines

use serde_json::Value;

use crate::types::events::StreamEvent;

/// Longest line excerpt included in a malformed-JSON log entry
const LOG_PREVIEW_CHARS: usize = 200;

/// Result of decoding one line
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedLine {
    /// Decoded value; `None` for blank or malformed input
    pub value: Option<Value>,
    /// Diagnostic event for malformed input
    pub error_event: Option<StreamEvent>,
}

/// Decode one line of agent output as JSON
///
/// Blank input yields no value and no error. A decoded string that itself
/// looks like a JSON object or array gets one more decode pass, and keeps the
/// first-pass value if that fails. Malformed input yields an `Error` event
/// naming `source_label`; callers keep processing later lines.
pub fn parse_json_line(line: &str, source_label: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ParsedLine::default();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => ParsedLine {
            value: Some(unwrap_double_encoded(value)),
            error_event: None,
        },
        Err(e) => {
            let preview: String = trimmed.chars().take(LOG_PREVIEW_CHARS).collect();
            log::warn!("{source_label} stream emitted malformed JSON ({e}): {preview}");
            ParsedLine {
                value: None,
                error_event: Some(StreamEvent::error(format!(
                    "{source_label} stream emitted malformed JSON"
                ))),
            }
        }
    }
}

fn unwrap_double_encoded(value: Value) -> Value {
    let Value::String(encoded) = &value else {
        return value;
    };

    let inner = encoded.trim();
    let looks_structured = (inner.starts_with('{') && inner.ends_with('}'))
        || (inner.starts_with('[') && inner.ends_with(']'));
    if !looks_structured {
        return value;
    }

    serde_json::from_str::<Value>(inner).unwrap_or(value)
}
