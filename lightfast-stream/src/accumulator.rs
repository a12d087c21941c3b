//! Message accumulation.
//!
//! Folds an ordered stream of [`StreamEvent`]s into the parts of one
//! assistant message.

use crate::event::{FinishReason, StreamEvent, Usage};
use crate::part::{AssistantMessage, MessagePart, ToolKind, ToolPart};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, trace};

const ERROR_PREFIX: &str = "Error: ";

/// Tool call seen via `tool-input-start` whose input is not final yet.
#[derive(Debug, Clone)]
struct InFlightToolCall {
    tool_name: String,
}

/// Builds one assistant message from its event stream.
///
/// Text deltas collect in a pending buffer that is only turned into a part on
/// `text-end` or `finish`, so [`current_text`](Self::current_text) can drive a
/// live typing view. Tool parts are stored in emission order with a side index
/// from `toolCallId` to position; a result updates its part in place.
///
/// Nothing here fails. Events that do not fit (orphan results, unknown tools,
/// duplicates, unknown event types) are dropped so one bad frame cannot end a
/// healthy stream.
///
/// One accumulator serves one response. Use [`reset`](Self::reset) to reuse
/// it for the next turn.
///
/// # Example
///
/// ```
/// use lightfast_stream::{parse_chunk, MessageAccumulator, MessagePart};
///
/// let mut acc = MessageAccumulator::new();
/// acc.process_events(parse_chunk(concat!(
///     "data: {\"type\":\"text-delta\",\"delta\":\"Hel\"}\n\n",
///     "data: {\"type\":\"text-delta\",\"delta\":\"lo\"}\n\n",
///     "data: {\"type\":\"text-end\",\"id\":\"1\"}\n\n",
/// )));
///
/// assert_eq!(acc.parts(), &[MessagePart::text("Hello")]);
/// ```
#[derive(Debug, Default)]
pub struct MessageAccumulator {
    text_buffer: String,
    parts: Vec<MessagePart>,
    tool_index: HashMap<String, usize>,
    in_flight: HashMap<String, InFlightToolCall>,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    finished: bool,
}

impl MessageAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event.
    pub fn process_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::TextDelta { delta, .. } => self.text_buffer.push_str(&delta),
            StreamEvent::TextEnd { .. } => self.flush_text(),
            StreamEvent::TextStart { .. } => {}
            StreamEvent::ToolInputStart {
                tool_call_id,
                tool_name,
            } => {
                trace!(tool_call_id = %tool_call_id, tool_name = %tool_name, "Tool input started");
                self.in_flight
                    .entry(tool_call_id)
                    .or_insert(InFlightToolCall { tool_name });
            }
            // Incremental input rendering is not part of the message.
            StreamEvent::ToolInputDelta { .. } => {}
            StreamEvent::ToolInputAvailable {
                tool_call_id,
                tool_name,
                input,
            } => self.add_tool_input(tool_call_id, &tool_name, input),
            StreamEvent::ToolResult {
                tool_call_id,
                result,
                ..
            } => self.add_tool_result(&tool_call_id, result),
            StreamEvent::Error { error_text } => {
                debug!(error = %error_text, "Stream reported an error");
                self.parts
                    .push(MessagePart::text(format!("{ERROR_PREFIX}{error_text}")));
            }
            StreamEvent::Finish {
                finish_reason,
                usage,
            } => {
                self.flush_text();
                if finish_reason.is_some() {
                    self.finish_reason = finish_reason;
                }
                if usage.is_some() {
                    self.usage = usage;
                }
                self.finished = true;
            }
            StreamEvent::Unknown => trace!("Ignoring unknown stream event"),
        }
    }

    /// Apply a sequence of events in order.
    pub fn process_events<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = StreamEvent>,
    {
        for event in events {
            self.process_event(event);
        }
    }

    /// Text received since the last flushed text part.
    pub fn current_text(&self) -> &str {
        &self.text_buffer
    }

    /// Finalized parts in emission order.
    pub fn parts(&self) -> &[MessagePart] {
        &self.parts
    }

    /// Check whether the response has produced anything visible.
    pub fn has_content(&self) -> bool {
        !self.parts.is_empty() || !self.text_buffer.trim().is_empty()
    }

    /// Check whether a `finish` event has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Finish reason from the last `finish` event that carried one.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Usage from the last `finish` event that carried it.
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// Return to the initial empty state, keeping allocations.
    pub fn reset(&mut self) {
        self.text_buffer.clear();
        self.parts.clear();
        self.tool_index.clear();
        self.in_flight.clear();
        self.finish_reason = None;
        self.usage = None;
        self.finished = false;
    }

    /// Snapshot the message built so far.
    ///
    /// Pending text that was never flushed is not included.
    pub fn to_message(&self) -> AssistantMessage {
        AssistantMessage {
            parts: self.parts.clone(),
            finish_reason: self.finish_reason,
            usage: self.usage,
        }
    }

    /// Consume the accumulator, flushing pending text into a final part.
    pub fn into_message(mut self) -> AssistantMessage {
        self.flush_text();
        AssistantMessage {
            parts: self.parts,
            finish_reason: self.finish_reason,
            usage: self.usage,
        }
    }

    fn flush_text(&mut self) {
        if self.text_buffer.trim().is_empty() {
            self.text_buffer.clear();
            return;
        }
        let text = std::mem::take(&mut self.text_buffer);
        self.parts.push(MessagePart::text(text));
    }

    fn add_tool_input(&mut self, tool_call_id: String, tool_name: &str, input: Value) {
        if let Some(started) = self.in_flight.remove(&tool_call_id) {
            if started.tool_name != tool_name {
                debug!(
                    tool_call_id = %tool_call_id,
                    started_as = %started.tool_name,
                    tool_name,
                    "Tool name changed between input start and input available"
                );
            }
        }

        let Some(kind) = ToolKind::from_name(tool_name) else {
            debug!(tool_call_id = %tool_call_id, tool_name, "Dropping call to unrecognised tool");
            return;
        };

        if self.tool_index.contains_key(&tool_call_id) {
            debug!(tool_call_id = %tool_call_id, "Dropping duplicate tool input");
            return;
        }

        self.tool_index.insert(tool_call_id.clone(), self.parts.len());
        self.parts
            .push(ToolPart::pending(kind, tool_call_id, input).into());
    }

    fn add_tool_result(&mut self, tool_call_id: &str, result: Value) {
        let part = self
            .tool_index
            .get(tool_call_id)
            .and_then(|&idx| self.parts.get_mut(idx))
            .and_then(MessagePart::as_tool_mut);

        match part {
            Some(part) => part.complete(result),
            None => debug!(tool_call_id, "Dropping tool result without a pending part"),
        }
    }
}
