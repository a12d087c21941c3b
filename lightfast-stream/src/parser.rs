//! SSE line parsing.
//!
//! Turns raw `data:` frames into [`StreamEvent`]s. Parsing never fails:
//! anything that is not a decodable data frame yields `None` and is skipped.

use crate::event::StreamEvent;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// A data frame that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    /// The raw line as received.
    pub line: String,
    /// Decoder error message.
    pub message: String,
}

type DiagnosticFn = Arc<dyn Fn(&ParseDiagnostic) + Send + Sync>;

/// Line parser with an optional diagnostic hook.
///
/// The free functions [`parse_line`] and [`parse_chunk`] use a parser with
/// no hook; malformed frames are still logged through `tracing`.
#[derive(Clone, Default)]
pub struct LineParser {
    on_diagnostic: Option<DiagnosticFn>,
}

impl fmt::Debug for LineParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineParser")
            .field("on_diagnostic", &self.on_diagnostic.is_some())
            .finish()
    }
}

impl LineParser {
    /// Create a parser without a diagnostic hook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report malformed frames to `callback` in addition to logging them.
    #[must_use]
    pub fn with_diagnostics<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ParseDiagnostic) + Send + Sync + 'static,
    {
        self.on_diagnostic = Some(Arc::new(callback));
        self
    }

    /// Parse one SSE line.
    ///
    /// Returns `None` for blank lines, comments, `event:`/`id:` fields, and
    /// data frames whose payload is not a valid event.
    pub fn parse_line(&self, raw_line: &str) -> Option<StreamEvent> {
        let line = raw_line.trim_end_matches(['\r', '\n']);
        let payload = line.strip_prefix(DATA_PREFIX)?.trim();

        if payload == DONE_SENTINEL {
            return Some(StreamEvent::done());
        }

        match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(error = %err, line = %line, "Skipping undecodable stream frame");
                if let Some(callback) = &self.on_diagnostic {
                    callback(&ParseDiagnostic {
                        line: line.to_string(),
                        message: err.to_string(),
                    });
                }
                None
            }
        }
    }

    /// Parse every line of a network chunk, keeping successful events in order.
    pub fn parse_chunk(&self, chunk: &str) -> Vec<StreamEvent> {
        chunk
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| self.parse_line(line))
            .collect()
    }
}

/// Parse one SSE line. See [`LineParser::parse_line`].
pub fn parse_line(raw_line: &str) -> Option<StreamEvent> {
    LineParser::new().parse_line(raw_line)
}

/// Parse a raw chunk of complete lines. See [`LineParser::parse_chunk`].
pub fn parse_chunk(chunk: &str) -> Vec<StreamEvent> {
    LineParser::new().parse_chunk(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FinishReason;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_parse_data_line() {
        let event = parse_line(r#"data: {"type":"text-delta","delta":"Hel"}"#);
        assert_eq!(event, Some(StreamEvent::text_delta("Hel")));
    }

    #[test]
    fn test_parse_without_space_after_prefix() {
        let event = parse_line(r#"data:{"type":"text-end","id":"1"}"#);
        assert_eq!(event, Some(StreamEvent::text_end("1")));
    }

    #[test]
    fn test_parse_crlf_line() {
        let event = parse_line("data: {\"type\":\"error\",\"errorText\":\"x\"}\r");
        assert_eq!(event, Some(StreamEvent::error("x")));
    }

    #[rstest]
    #[case("data: [DONE]")]
    #[case("data:[DONE]")]
    #[case("data:   [DONE]  ")]
    fn test_done_sentinel(#[case] line: &str) {
        assert_eq!(parse_line(line), Some(StreamEvent::done()));
    }

    #[rstest]
    #[case::blank("")]
    #[case::comment(": keep-alive")]
    #[case::event_field("event: ping")]
    #[case::id_field("id: 42")]
    #[case::retry_field("retry: 1000")]
    #[case::indented_data("  data: {\"type\":\"text-end\",\"id\":\"1\"}")]
    fn test_non_data_lines(#[case] line: &str) {
        assert_eq!(parse_line(line), None);
    }

    #[rstest]
    #[case::truncated(r#"data: {"type":"text-delta","del"#)]
    #[case::not_json("data: hello")]
    #[case::empty_payload("data:")]
    #[case::missing_field(r#"data: {"type":"tool-result"}"#)]
    fn test_malformed_payload(#[case] line: &str) {
        assert_eq!(parse_line(line), None);
    }

    #[test]
    fn test_unknown_type_is_parsed_as_unknown() {
        let event = parse_line(r#"data: {"type":"reasoning-delta","delta":"hmm"}"#);
        assert_eq!(event, Some(StreamEvent::Unknown));
    }

    #[test]
    fn test_parse_chunk_keeps_order_and_skips_noise() {
        let chunk = concat!(
            "event: ping\n",
            "data: {\"type\":\"text-delta\",\"delta\":\"Hel\"}\n",
            "\n",
            ": comment\n",
            "data: {\"type\":\"text-delta\",\"delta\":\"lo\"}\n",
            "data: not json\n",
            "\n",
            "data: {\"type\":\"finish\",\"finishReason\":\"stop\"}\n",
            "\n",
            "data: [DONE]\n",
        );

        let events = parse_chunk(chunk);
        assert_eq!(
            events,
            vec![
                StreamEvent::text_delta("Hel"),
                StreamEvent::text_delta("lo"),
                StreamEvent::Finish {
                    finish_reason: Some(FinishReason::Stop),
                    usage: None,
                },
                StreamEvent::done(),
            ]
        );
    }

    #[test]
    fn test_parse_chunk_omits_event_lines() {
        assert!(parse_chunk("event: ping\n\n").is_empty());
    }

    #[test]
    fn test_diagnostic_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let parser = LineParser::new().with_diagnostics(move |diag| {
            sink.lock().unwrap().push(diag.clone());
        });

        let events = parser.parse_chunk(concat!(
            "data: {oops}\n",
            "data: {\"type\":\"tool-input-available\",\"toolCallId\":\"a\",\"toolName\":\"run_coding_tool\",\"input\":{}}\n",
        ));

        assert_eq!(
            events,
            vec![StreamEvent::tool_input_available("a", "run_coding_tool", json!({}))]
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].line, "data: {oops}");
        assert!(!seen[0].message.is_empty());
    }

    #[test]
    fn test_diagnostic_not_called_for_ignored_lines() {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = calls.clone();
        let parser = LineParser::new().with_diagnostics(move |_| {
            *counter.lock().unwrap() += 1;
        });

        parser.parse_chunk("event: ping\n: comment\nid: 1\ndata: [DONE]\n");
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
