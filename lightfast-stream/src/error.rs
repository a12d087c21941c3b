//! Stream errors.

use thiserror::Error;

/// Errors raised by the fallible edges of the stream pipeline.
///
/// The line parser and the [`MessageAccumulator`](crate::MessageAccumulator)
/// never return these; they degrade to "skip and continue". Errors only come
/// from buffering raw transport bytes and from decoding persisted parts.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A single unterminated line grew past the buffer limit.
    #[error("SSE line exceeded {limit} bytes without a newline")]
    BufferOverflow {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// JSON decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error from the underlying byte stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted message part had an unexpected shape.
    #[error("Invalid message part: {0}")]
    InvalidPart(String),
}

impl StreamError {
    /// Check if the stream can keep going after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BufferOverflow { .. } | Self::Json(_))
    }

    /// Create an invalid-part error.
    pub fn invalid_part(msg: impl Into<String>) -> Self {
        Self::InvalidPart(msg.into())
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StreamError::BufferOverflow { limit: 16 };
        assert_eq!(err.to_string(), "SSE line exceeded 16 bytes without a newline");

        let err = StreamError::invalid_part("unknown type `image`");
        assert_eq!(err.to_string(), "Invalid message part: unknown type `image`");
    }

    #[test]
    fn test_recoverable() {
        assert!(StreamError::BufferOverflow { limit: 1 }.is_recoverable());
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(!StreamError::from(io).is_recoverable());
        assert!(!StreamError::invalid_part("x").is_recoverable());
    }
}
