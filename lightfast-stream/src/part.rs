//! Message parts produced by the accumulator.
//!
//! Parts serialize in the shape the chat UI and the thread store expect:
//!
//! ```json
//! {"type": "text", "text": "Hello"}
//! {"type": "tool-run_coding_tool", "toolCallId": "a", "state": "output-available",
//!  "input": {"cmd": "ls"}, "output": {"output": "file.txt"}}
//! ```

use crate::error::StreamError;
use crate::event::{FinishReason, Usage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TOOL_TYPE_PREFIX: &str = "tool-";

/// Tool kinds surfaced as message parts.
///
/// Tool calls for any other tool name are dropped by the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Sandboxed code execution.
    RunCodingTool,
}

impl ToolKind {
    /// Every recognised kind.
    pub const ALL: &'static [ToolKind] = &[ToolKind::RunCodingTool];

    /// Look up a kind by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Wire name of the tool.
    pub fn name(self) -> &'static str {
        match self {
            Self::RunCodingTool => "run_coding_tool",
        }
    }

    /// Part `type` string, e.g. `tool-run_coding_tool`.
    pub fn part_type(self) -> String {
        format!("{TOOL_TYPE_PREFIX}{}", self.name())
    }
}

/// Lifecycle state of a tool part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    /// Input is known, result pending.
    InputAvailable,
    /// Result has arrived.
    OutputAvailable,
}

/// A finalized text segment.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPart {
    /// The text content.
    pub text: String,
}

impl TextPart {
    /// Create a new text part.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A tool invocation and, once available, its output.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPart {
    /// Which tool was called.
    pub kind: ToolKind,
    /// Correlation id from the stream.
    pub tool_call_id: String,
    /// Current lifecycle state.
    pub state: ToolState,
    /// Finalized tool input.
    pub input: Value,
    /// Tool output, present once `state` is `OutputAvailable`.
    pub output: Option<Value>,
}

impl ToolPart {
    /// Create a pending tool part.
    pub fn pending(kind: ToolKind, tool_call_id: impl Into<String>, input: Value) -> Self {
        Self {
            kind,
            tool_call_id: tool_call_id.into(),
            state: ToolState::InputAvailable,
            input,
            output: None,
        }
    }

    /// Attach the output, moving the part to `OutputAvailable`.
    pub fn complete(&mut self, output: Value) {
        self.state = ToolState::OutputAvailable;
        self.output = Some(output);
    }

    /// Builder form of [`complete`](Self::complete).
    pub fn with_output(mut self, output: Value) -> Self {
        self.complete(output);
        self
    }

    /// Check whether the output has arrived.
    pub fn is_complete(&self) -> bool {
        self.state == ToolState::OutputAvailable
    }
}

/// One element of an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPart", into = "RawPart")]
pub enum MessagePart {
    /// Plain text.
    Text(TextPart),
    /// Tool call.
    Tool(ToolPart),
}

impl MessagePart {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextPart::new(text))
    }

    /// Get the part `type` string.
    pub fn part_type(&self) -> String {
        match self {
            Self::Text(_) => "text".to_string(),
            Self::Tool(part) => part.kind.part_type(),
        }
    }

    /// Get the text if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(part) => Some(&part.text),
            Self::Tool(_) => None,
        }
    }

    /// Get the tool part if this is one.
    pub fn as_tool(&self) -> Option<&ToolPart> {
        match self {
            Self::Tool(part) => Some(part),
            Self::Text(_) => None,
        }
    }

    pub(crate) fn as_tool_mut(&mut self) -> Option<&mut ToolPart> {
        match self {
            Self::Tool(part) => Some(part),
            Self::Text(_) => None,
        }
    }
}

impl From<TextPart> for MessagePart {
    fn from(part: TextPart) -> Self {
        Self::Text(part)
    }
}

impl From<ToolPart> for MessagePart {
    fn from(part: ToolPart) -> Self {
        Self::Tool(part)
    }
}

/// Flat wire shape shared by every part type.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPart {
    #[serde(rename = "type")]
    part_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<ToolState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<Value>,
}

impl From<MessagePart> for RawPart {
    fn from(part: MessagePart) -> Self {
        match part {
            MessagePart::Text(text) => RawPart {
                part_type: "text".to_string(),
                text: Some(text.text),
                tool_call_id: None,
                state: None,
                input: None,
                output: None,
            },
            MessagePart::Tool(tool) => RawPart {
                part_type: tool.kind.part_type(),
                text: None,
                tool_call_id: Some(tool.tool_call_id),
                state: Some(tool.state),
                input: Some(tool.input),
                output: tool.output,
            },
        }
    }
}

impl TryFrom<RawPart> for MessagePart {
    type Error = StreamError;

    fn try_from(raw: RawPart) -> Result<Self, Self::Error> {
        if raw.part_type == "text" {
            let text = raw
                .text
                .ok_or_else(|| StreamError::invalid_part("text part without `text`"))?;
            return Ok(Self::text(text));
        }

        let name = raw.part_type.strip_prefix(TOOL_TYPE_PREFIX).ok_or_else(|| {
            StreamError::invalid_part(format!("unknown part type `{}`", raw.part_type))
        })?;
        let kind = ToolKind::from_name(name)
            .ok_or_else(|| StreamError::invalid_part(format!("unknown tool `{name}`")))?;
        let tool_call_id = raw
            .tool_call_id
            .ok_or_else(|| StreamError::invalid_part("tool part without `toolCallId`"))?;

        let state = match (raw.state, raw.output.is_some()) {
            (Some(state), _) => state,
            (None, true) => ToolState::OutputAvailable,
            (None, false) => ToolState::InputAvailable,
        };
        if state == ToolState::OutputAvailable && raw.output.is_none() {
            return Err(StreamError::invalid_part(
                "output-available tool part without `output`",
            ));
        }

        Ok(Self::Tool(ToolPart {
            kind,
            tool_call_id,
            state,
            input: raw.input.unwrap_or(Value::Null),
            output: raw.output,
        }))
    }
}

/// A finished assistant message, ready for persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessage {
    /// Parts in emission order.
    pub parts: Vec<MessagePart>,
    /// Why the model stopped, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Token usage, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl AssistantMessage {
    /// Concatenate every text part.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(MessagePart::as_text).collect()
    }

    /// Iterate over tool parts.
    pub fn tool_parts(&self) -> impl Iterator<Item = &ToolPart> {
        self.parts.iter().filter_map(MessagePart::as_tool)
    }

    /// Check if the message has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
