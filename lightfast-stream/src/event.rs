//! Stream event types.
//!
//! These mirror the chunk shapes emitted by the AI SDK data stream protocol
//! on the serving side. Each SSE `data:` payload is one JSON object with a
//! `type` discriminator.
//!
//! Based on: https://ai-sdk.dev/docs/ai-sdk-ui/stream-protocol

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Finish reason reported by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// Normal stop (end of response).
    Stop,
    /// Maximum token length reached.
    Length,
    /// Content filter triggered.
    ContentFilter,
    /// Tool calls need to be executed.
    ToolCalls,
    /// Error occurred.
    Error,
    /// Other/custom reason.
    Other,
    /// Unknown or unrecognised reason.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Token usage attached to a `finish` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Number of prompt/input tokens.
    #[serde(default, alias = "promptTokens", skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    /// Number of completion/output tokens.
    #[serde(default, alias = "completionTokens", skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    /// Total tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl Usage {
    /// Create empty usage info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set input tokens.
    pub fn with_input_tokens(mut self, tokens: u64) -> Self {
        self.input_tokens = Some(tokens);
        self
    }

    /// Set output tokens.
    pub fn with_output_tokens(mut self, tokens: u64) -> Self {
        self.output_tokens = Some(tokens);
        self
    }

    /// Set total tokens.
    pub fn with_total_tokens(mut self, tokens: u64) -> Self {
        self.total_tokens = Some(tokens);
        self
    }
}

/// A single decoded event from the chat stream.
///
/// Unrecognised `type` values decode to [`StreamEvent::Unknown`] so newer
/// servers can add event kinds without breaking older clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    /// A text segment begins.
    TextStart {
        /// Segment identifier.
        #[serde(default)]
        id: String,
    },
    /// A fragment of assistant text.
    TextDelta {
        /// The text fragment.
        #[serde(alias = "textDelta")]
        delta: String,
        /// Segment identifier, if the server sends one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    /// A text segment ends.
    TextEnd {
        /// Segment identifier.
        #[serde(default)]
        id: String,
    },
    /// The model started producing input for a tool call.
    #[serde(rename_all = "camelCase")]
    ToolInputStart {
        /// Correlates every event of one tool call.
        tool_call_id: String,
        /// Name of the tool being called.
        tool_name: String,
    },
    /// A fragment of tool call input.
    #[serde(rename_all = "camelCase")]
    ToolInputDelta {
        /// Correlates every event of one tool call.
        tool_call_id: String,
        /// Name of the tool being called.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        /// Raw input fragment.
        #[serde(default, alias = "inputTextDelta")]
        delta: String,
    },
    /// Tool call input is complete.
    #[serde(rename_all = "camelCase")]
    ToolInputAvailable {
        /// Correlates every event of one tool call.
        tool_call_id: String,
        /// Name of the tool being called.
        tool_name: String,
        /// Finalized input.
        #[serde(default)]
        input: Value,
    },
    /// Tool execution finished.
    #[serde(rename = "tool-result", alias = "tool-output-available", rename_all = "camelCase")]
    ToolResult {
        /// Correlates every event of one tool call.
        tool_call_id: String,
        /// Name of the tool that ran.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        /// Tool output.
        #[serde(default, alias = "output")]
        result: Value,
    },
    /// In-band error reported by the server.
    #[serde(rename_all = "camelCase")]
    Error {
        /// Human-readable error text.
        #[serde(alias = "error")]
        error_text: String,
    },
    /// The response is complete.
    #[serde(rename_all = "camelCase")]
    Finish {
        /// Why the model stopped.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<FinishReason>,
        /// Token usage, if reported.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
    /// Any event type this crate does not know about.
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Create a text delta event.
    pub fn text_delta(delta: impl Into<String>) -> Self {
        Self::TextDelta {
            delta: delta.into(),
            id: None,
        }
    }

    /// Create a text end event.
    pub fn text_end(id: impl Into<String>) -> Self {
        Self::TextEnd { id: id.into() }
    }

    /// Create a tool input available event.
    pub fn tool_input_available(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: Value,
    ) -> Self {
        Self::ToolInputAvailable {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            input,
        }
    }

    /// Create a tool result event.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: Value,
    ) -> Self {
        Self::ToolResult {
            tool_call_id: tool_call_id.into(),
            tool_name: Some(tool_name.into()),
            result,
        }
    }

    /// Create an error event.
    pub fn error(error_text: impl Into<String>) -> Self {
        Self::Error {
            error_text: error_text.into(),
        }
    }

    /// The synthetic finish event produced by a `[DONE]` sentinel.
    pub fn done() -> Self {
        Self::Finish {
            finish_reason: None,
            usage: None,
        }
    }

    /// Get the wire `type` discriminator.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TextStart { .. } => "text-start",
            Self::TextDelta { .. } => "text-delta",
            Self::TextEnd { .. } => "text-end",
            Self::ToolInputStart { .. } => "tool-input-start",
            Self::ToolInputDelta { .. } => "tool-input-delta",
            Self::ToolInputAvailable { .. } => "tool-input-available",
            Self::ToolResult { .. } => "tool-result",
            Self::Error { .. } => "error",
            Self::Finish { .. } => "finish",
            Self::Unknown => "unknown",
        }
    }

    /// Check if this event terminates the response.
    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Finish { .. })
    }

    /// Get the tool call id for tool lifecycle events.
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::ToolInputStart { tool_call_id, .. }
            | Self::ToolInputDelta { tool_call_id, .. }
            | Self::ToolInputAvailable { tool_call_id, .. }
            | Self::ToolResult { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn decode(value: Value) -> StreamEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_decode_text_events() {
        assert_eq!(
            decode(json!({"type": "text-delta", "delta": "Hel"})),
            StreamEvent::text_delta("Hel")
        );
        assert_eq!(
            decode(json!({"type": "text-end", "id": "1"})),
            StreamEvent::text_end("1")
        );
        assert_eq!(
            decode(json!({"type": "text-start", "id": "1"})),
            StreamEvent::TextStart { id: "1".into() }
        );
    }

    #[test]
    fn test_decode_text_delta_alias() {
        let event = decode(json!({"type": "text-delta", "textDelta": "hi"}));
        assert_eq!(event, StreamEvent::text_delta("hi"));
    }

    #[test]
    fn test_decode_tool_events() {
        let event = decode(json!({
            "type": "tool-input-available",
            "toolCallId": "a",
            "toolName": "run_coding_tool",
            "input": {"cmd": "ls"}
        }));
        assert_eq!(
            event,
            StreamEvent::tool_input_available("a", "run_coding_tool", json!({"cmd": "ls"}))
        );
        assert_eq!(event.tool_call_id(), Some("a"));

        let event = decode(json!({
            "type": "tool-result",
            "toolCallId": "a",
            "toolName": "run_coding_tool",
            "result": {"output": "file.txt"}
        }));
        assert_eq!(
            event,
            StreamEvent::tool_result("a", "run_coding_tool", json!({"output": "file.txt"}))
        );
    }

    #[test]
    fn test_decode_tool_output_available_alias() {
        let event = decode(json!({
            "type": "tool-output-available",
            "toolCallId": "a",
            "output": "done"
        }));
        assert_eq!(
            event,
            StreamEvent::ToolResult {
                tool_call_id: "a".into(),
                tool_name: None,
                result: json!("done"),
            }
        );
    }

    #[test]
    fn test_decode_error_and_finish() {
        assert_eq!(
            decode(json!({"type": "error", "errorText": "boom"})),
            StreamEvent::error("boom")
        );

        let event = decode(json!({
            "type": "finish",
            "finishReason": "tool-calls",
            "usage": {"promptTokens": 10, "completionTokens": 5, "totalTokens": 15}
        }));
        assert_eq!(
            event,
            StreamEvent::Finish {
                finish_reason: Some(FinishReason::ToolCalls),
                usage: Some(
                    Usage::new()
                        .with_input_tokens(10)
                        .with_output_tokens(5)
                        .with_total_tokens(15)
                ),
            }
        );
        assert_eq!(decode(json!({"type": "finish"})), StreamEvent::done());
    }

    #[test]
    fn test_unrecognised_finish_reason() {
        let event = decode(json!({"type": "finish", "finishReason": "cosmic-rays"}));
        assert_eq!(
            event,
            StreamEvent::Finish {
                finish_reason: Some(FinishReason::Unknown),
                usage: None,
            }
        );
    }

    #[test]
    fn test_unknown_event_type() {
        let event = decode(json!({"type": "start-step", "messageId": "m1"}));
        assert_eq!(event, StreamEvent::Unknown);
        assert_eq!(event.event_type(), "unknown");
    }

    #[test]
    fn test_missing_required_field_fails() {
        let result = serde_json::from_value::<StreamEvent>(json!({"type": "tool-input-start"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_camel_case() {
        let json = serde_json::to_string(&StreamEvent::tool_input_available(
            "call-1",
            "run_coding_tool",
            json!({}),
        ))
        .unwrap();
        assert!(json.contains(r#""type":"tool-input-available""#));
        assert!(json.contains(r#""toolCallId":"call-1""#));
        assert!(json.contains(r#""toolName":"run_coding_tool""#));
    }

    #[test]
    fn test_event_type_matches_wire_tag() {
        let events = [
            StreamEvent::text_delta("x"),
            StreamEvent::text_end("1"),
            StreamEvent::error("e"),
            StreamEvent::done(),
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.event_type());
        }
        assert!(StreamEvent::done().is_finish());
    }
}
