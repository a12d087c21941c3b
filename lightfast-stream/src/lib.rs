//! # lightfast-stream
//!
//! Decoding and accumulation of Lightfast chat response streams.
//!
//! The chat backend streams an assistant response as server-sent events,
//! one JSON object per `data:` frame. This crate turns those frames into a
//! structured assistant message:
//!
//! ```text
//! bytes ─► SseLineBuffer ─► LineParser ─► StreamEvent ─► MessageAccumulator ─► MessagePart[]
//! ```
//!
//! ## Core Concepts
//!
//! - **[`StreamEvent`]**: Typed stream events (text deltas, tool call lifecycle, errors, finish)
//! - **[`parse_line`] / [`parse_chunk`]**: Decode SSE lines; never fail, skip what they cannot read
//! - **[`SseLineBuffer`]**: Reassemble lines split across network reads
//! - **[`EventStream`]**: Adapt a byte stream into a stream of events
//! - **[`MessageAccumulator`]**: Fold events into ordered [`MessagePart`]s
//!
//! Everything here is synchronous apart from [`EventStream`]; the transport
//! that owns the connection lives in `lightfast-client`.
//!
//! ## Example
//!
//! ```
//! use lightfast_stream::{MessageAccumulator, SseLineBuffer};
//!
//! let mut lines = SseLineBuffer::new();
//! let mut acc = MessageAccumulator::new();
//!
//! for chunk in ["data: {\"type\":\"text-delta\",\"del", "ta\":\"Hi\"}\n\ndata: [DONE]\n\n"] {
//!     acc.process_events(lines.feed_str(chunk).unwrap());
//! }
//!
//! assert!(acc.is_finished());
//! assert_eq!(acc.into_message().text(), "Hi");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod accumulator;
pub mod error;
pub mod event;
pub mod parser;
pub mod part;
pub mod sse;

// Re-exports
pub use accumulator::MessageAccumulator;
pub use error::{StreamError, StreamResult};
pub use event::{FinishReason, StreamEvent, Usage};
pub use parser::{parse_chunk, parse_line, LineParser, ParseDiagnostic};
pub use part::{AssistantMessage, MessagePart, TextPart, ToolKind, ToolPart, ToolState};
pub use sse::{EventStream, SseLineBuffer, MAX_LINE_LENGTH};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        parse_chunk, parse_line, AssistantMessage, EventStream, MessageAccumulator, MessagePart,
        SseLineBuffer, StreamError, StreamEvent, StreamResult, ToolKind, ToolState,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let acc = MessageAccumulator::new();
        assert!(!acc.has_content());
        assert_eq!(ToolKind::from_name("run_coding_tool"), Some(ToolKind::RunCodingTool));
    }

    #[test]
    fn test_pipeline_end_to_end() {
        let body = concat!(
            "data: {\"type\":\"start\",\"messageId\":\"m1\"}\n\n",
            "data: {\"type\":\"text-start\",\"id\":\"t1\"}\n\n",
            "data: {\"type\":\"text-delta\",\"id\":\"t1\",\"delta\":\"Checking \"}\n\n",
            "data: {\"type\":\"text-delta\",\"id\":\"t1\",\"delta\":\"files.\"}\n\n",
            "data: {\"type\":\"text-end\",\"id\":\"t1\"}\n\n",
            "data: {\"type\":\"tool-input-start\",\"toolCallId\":\"c1\",\"toolName\":\"run_coding_tool\"}\n\n",
            "data: {\"type\":\"tool-input-delta\",\"toolCallId\":\"c1\",\"toolName\":\"run_coding_tool\",\"delta\":\"{\"}\n\n",
            "data: {\"type\":\"tool-input-available\",\"toolCallId\":\"c1\",\"toolName\":\"run_coding_tool\",\"input\":{\"cmd\":\"ls\"}}\n\n",
            "data: {\"type\":\"tool-result\",\"toolCallId\":\"c1\",\"toolName\":\"run_coding_tool\",\"result\":{\"output\":\"file.txt\"}}\n\n",
            "data: {\"type\":\"finish\",\"finishReason\":\"stop\"}\n\n",
            "data: [DONE]\n\n",
        );

        let mut lines = SseLineBuffer::new();
        let mut acc = MessageAccumulator::new();
        for chunk in body.as_bytes().chunks(7) {
            acc.process_events(lines.feed(chunk).unwrap());
        }
        acc.process_events(lines.finish());

        let message = acc.into_message();
        assert_eq!(message.finish_reason, Some(FinishReason::Stop));
        assert_eq!(message.text(), "Checking files.");
        let tools: Vec<&ToolPart> = message.tool_parts().collect();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].state, ToolState::OutputAvailable);
    }
}
