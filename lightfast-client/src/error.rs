//! Client error types.

use lightfast_stream::StreamError;
use std::time::Duration;
use thiserror::Error;

/// Errors from opening or reading a chat stream.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server answered with a non-success status.
    #[error("HTTP error {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
        /// Retry-After header value.
        retry_after: Option<Duration>,
    },

    /// Request timed out.
    #[error("Timeout")]
    Timeout,

    /// Could not connect, or the connection dropped.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Any other reqwest failure.
    #[error("Request error: {0}")]
    Request(#[source] reqwest::Error),

    /// The configured URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Stream decoding failed.
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// The stream kept dropping and every resume attempt was used.
    #[error("Stream dropped {attempts} times without finishing")]
    ResumeExhausted {
        /// Resume attempts made.
        attempts: u32,
    },
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() || err.is_body() {
            ClientError::Connection(err.to_string())
        } else {
            ClientError::Request(err)
        }
    }
}

impl ClientError {
    /// Create an HTTP error.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Get the HTTP status if this is an HTTP error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the suggested retry-after duration.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Check if this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::Timeout | Self::Connection(_) => true,
            Self::Stream(err) => matches!(err, StreamError::Io(_)),
            Self::Request(_) | Self::InvalidUrl(_) | Self::ResumeExhausted { .. } => false,
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
