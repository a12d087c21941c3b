//! # lightfast-client
//!
//! Resumable SSE client for Lightfast chat responses.
//!
//! Opens the chat endpoint, feeds the response body through
//! [`lightfast_stream`]'s parser and accumulator, and re-attaches to the
//! server's resume endpoint when the connection drops before the response
//! finishes.
//!
//! ## Core Concepts
//!
//! - **[`ResumableStreamClient`]**: Send a turn, stream it, resume on drop
//! - **[`ClientConfig`]**: Endpoint, auth, timeouts, retry and resume limits
//! - **[`RetryPolicy`]**: Backoff for opening connections
//! - **[`StreamOutcome`]**: The finished message plus how the stream ended
//!
//! ## Example
//!
//! ```ignore
//! use lightfast_client::{ClientConfig, ResumableStreamClient};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ClientConfig::new("https://app.lightfast.ai")?.with_bearer_token(token);
//! let client = ResumableStreamClient::new(config)?;
//!
//! let cancel = CancellationToken::new();
//! let outcome = client
//!     .send("thread-1", &request, &cancel, |acc| {
//!         render(acc.parts(), acc.current_text());
//!     })
//!     .await?;
//!
//! store.save(outcome.message).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod retry;

// Re-exports
pub use client::{ResumableStreamClient, StreamOutcome};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use retry::{with_retry, Backoff, RetryPolicy};
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        CancellationToken, ClientConfig, ClientError, ClientResult, ResumableStreamClient,
        RetryPolicy, StreamOutcome,
    };
    pub use lightfast_stream::prelude::*;
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let config = ClientConfig::new("http://localhost:3000")
            .unwrap()
            .with_retry(RetryPolicy::no_retry());
        assert_eq!(config.retry.max_retries, 0);
        assert!(!MessageAccumulator::new().has_content());
    }
}
