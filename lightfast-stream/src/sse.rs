//! Incremental SSE framing.
//!
//! Network reads do not respect line boundaries, so a `data:` frame can be
//! split across two chunks. [`SseLineBuffer`] keeps the unterminated tail
//! between reads and only hands complete lines to the [`LineParser`].

use crate::error::{StreamError, StreamResult};
use crate::event::StreamEvent;
use crate::parser::LineParser;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::trace;

/// Largest unterminated line the buffer will hold.
pub const MAX_LINE_LENGTH: usize = 10 * 1024 * 1024;

/// Buffers partial lines across network chunks.
#[derive(Debug, Clone)]
pub struct SseLineBuffer {
    buffer: String,
    /// Bytes of a UTF-8 sequence cut off at the end of the last chunk.
    pending_bytes: Vec<u8>,
    parser: LineParser,
    max_line_length: usize,
}

impl Default for SseLineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SseLineBuffer {
    /// Create a buffer with the default parser and limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parser(LineParser::new())
    }

    /// Create a buffer that parses lines with `parser`.
    #[must_use]
    pub fn with_parser(parser: LineParser) -> Self {
        Self {
            buffer: String::new(),
            pending_bytes: Vec::new(),
            parser,
            max_line_length: MAX_LINE_LENGTH,
        }
    }

    /// Override the maximum unterminated line length.
    #[must_use]
    pub fn with_max_line_length(mut self, limit: usize) -> Self {
        self.max_line_length = limit;
        self
    }

    /// Feed raw bytes.
    pub fn feed(&mut self, bytes: &[u8]) -> StreamResult<Vec<StreamEvent>> {
        self.pending_bytes.extend_from_slice(bytes);

        let decoded = std::str::from_utf8(&self.pending_bytes)
            .map(str::len)
            .map_err(|err| (err.valid_up_to(), err.error_len()));

        let valid_up_to = match decoded {
            Ok(len) => len,
            Err((valid_up_to, None)) => valid_up_to,
            Err((_, Some(_))) => {
                // Invalid (not merely truncated) UTF-8: decode lossily.
                let text = String::from_utf8_lossy(&self.pending_bytes).into_owned();
                self.pending_bytes.clear();
                return self.feed_str(&text);
            }
        };

        let rest = self.pending_bytes.split_off(valid_up_to);
        let complete = std::mem::replace(&mut self.pending_bytes, rest);
        let text = String::from_utf8(complete).unwrap_or_default();
        self.feed_str(&text)
    }

    /// Feed a string chunk.
    pub fn feed_str(&mut self, chunk: &str) -> StreamResult<Vec<StreamEvent>> {
        self.buffer.push_str(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }
            if let Some(event) = self.parser.parse_line(line) {
                events.push(event);
            }
        }

        if self.buffer.len() > self.max_line_length {
            let limit = self.max_line_length;
            self.buffer.clear();
            return Err(StreamError::BufferOverflow { limit });
        }

        Ok(events)
    }

    /// Flush a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if !self.pending_bytes.is_empty() {
            let tail = String::from_utf8_lossy(&self.pending_bytes).into_owned();
            self.pending_bytes.clear();
            self.buffer.push_str(&tail);
        }

        let line = std::mem::take(&mut self.buffer);
        let line = line.trim();
        if line.is_empty() {
            return Vec::new();
        }
        trace!(len = line.len(), "Flushing unterminated SSE line");
        self.parser.parse_line(line).into_iter().collect()
    }

    /// Number of buffered bytes not yet forming a complete line.
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.pending_bytes.len()
    }

    /// Discard any buffered partial line.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending_bytes.clear();
    }
}

pin_project! {
    /// Stream adapter that decodes [`StreamEvent`]s from a byte stream.
    pub struct EventStream<S> {
        #[pin]
        inner: S,
        lines: SseLineBuffer,
        ready: VecDeque<StreamEvent>,
        finished: bool,
    }
}

impl<S> EventStream<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>>,
{
    /// Wrap a byte stream.
    pub fn new(inner: S) -> Self {
        Self::with_buffer(inner, SseLineBuffer::new())
    }

    /// Wrap a byte stream with a preconfigured line buffer.
    pub fn with_buffer(inner: S, lines: SseLineBuffer) -> Self {
        Self {
            inner,
            lines,
            ready: VecDeque::new(),
            finished: false,
        }
    }
}

impl<S> Stream for EventStream<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Unpin,
{
    type Item = StreamResult<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(event) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            if *this.finished {
                return Poll::Ready(None);
            }

            match this.inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bytes))) => match this.lines.feed(&bytes) {
                    Ok(events) => this.ready.extend(events),
                    Err(error) => return Poll::Ready(Some(Err(error))),
                },
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(StreamError::Io(e)))),
                Poll::Ready(None) => {
                    *this.finished = true;
                    this.ready.extend(this.lines.finish());
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
