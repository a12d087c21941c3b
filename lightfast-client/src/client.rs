//! Resumable chat stream client.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::retry::with_retry;
use futures::{StreamExt, TryStreamExt};
use lightfast_stream::{AssistantMessage, EventStream, MessageAccumulator};
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Result of driving one response stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOutcome {
    /// The assistant message built from the stream.
    pub message: AssistantMessage,
    /// A `finish` event was received.
    pub completed: bool,
    /// The caller cancelled before the stream finished.
    pub aborted: bool,
    /// How many times the stream was re-attached after dropping.
    pub resumes: u32,
}

/// How a single response body ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drain {
    Finished,
    Cancelled,
    Ended,
}

/// Streams assistant responses and re-attaches when the connection drops.
///
/// Each call owns one [`MessageAccumulator`]; `observer` sees it after every
/// event so a UI can render partial output. A resumed stream replays the
/// response from its start, so the accumulator is reset before each replay.
#[derive(Debug, Clone)]
pub struct ResumableStreamClient {
    http: Client,
    config: ClientConfig,
}

impl ResumableStreamClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Create a client on top of an existing reqwest client.
    pub fn with_http_client(http: Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a new response for `chat_id` and stream it to completion.
    pub async fn send<B, F>(
        &self,
        chat_id: &str,
        body: &B,
        cancel: &CancellationToken,
        mut observer: F,
    ) -> ClientResult<StreamOutcome>
    where
        B: Serialize + ?Sized,
        F: FnMut(&MessageAccumulator),
    {
        let url = self.config.chat_url()?;
        info!(chat_id, url = %url, "Opening chat stream");

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(aborted(MessageAccumulator::new(), 0)),
            opened = with_retry(&self.config.retry, || {
                self.open(Method::POST, url.clone(), Some(body))
            }) => opened?,
        };

        let Some(response) = opened else {
            debug!(chat_id, "Chat endpoint returned no content");
            return Ok(StreamOutcome {
                completed: true,
                ..StreamOutcome::default()
            });
        };

        self.run(chat_id, response, cancel, &mut observer).await
    }

    /// Re-attach to the active response for `chat_id`.
    ///
    /// Returns `None` when the server has no stream in progress.
    pub async fn resume<F>(
        &self,
        chat_id: &str,
        cancel: &CancellationToken,
        mut observer: F,
    ) -> ClientResult<Option<StreamOutcome>>
    where
        F: FnMut(&MessageAccumulator),
    {
        let url = self.config.resume_url(chat_id)?;
        info!(chat_id, url = %url, "Resuming chat stream");

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Some(aborted(MessageAccumulator::new(), 0))),
            opened = self.open_resume(url) => opened?,
        };

        match opened {
            Some(response) => Ok(Some(
                self.run(chat_id, response, cancel, &mut observer).await?,
            )),
            None => Ok(None),
        }
    }

    async fn run<F>(
        &self,
        chat_id: &str,
        mut response: Response,
        cancel: &CancellationToken,
        observer: &mut F,
    ) -> ClientResult<StreamOutcome>
    where
        F: FnMut(&MessageAccumulator),
    {
        let mut acc = MessageAccumulator::new();
        let mut resumes = 0;

        loop {
            match drain(response, &mut acc, cancel, observer).await {
                Ok(Drain::Finished) => {
                    debug!(chat_id, resumes, "Chat stream finished");
                    return Ok(StreamOutcome {
                        message: acc.into_message(),
                        completed: true,
                        aborted: false,
                        resumes,
                    });
                }
                Ok(Drain::Cancelled) => {
                    info!(chat_id, "Chat stream cancelled");
                    return Ok(aborted(acc, resumes));
                }
                Ok(Drain::Ended) => {
                    warn!(chat_id, "Chat stream closed before finish");
                }
                Err(error) if error.is_retryable() => {
                    warn!(chat_id, error = %error, "Chat stream dropped");
                }
                Err(error) => return Err(error),
            }

            if resumes >= self.config.max_resumes {
                return Err(ClientError::ResumeExhausted { attempts: resumes });
            }
            resumes += 1;

            let url = self.config.resume_url(chat_id)?;
            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(aborted(acc, resumes)),
                opened = self.open_resume(url) => opened?,
            };

            match opened {
                Some(next) => {
                    debug!(chat_id, attempt = resumes, "Replaying resumed chat stream");
                    acc.reset();
                    response = next;
                }
                None => {
                    warn!(chat_id, "No active stream to resume");
                    return Ok(StreamOutcome {
                        message: acc.into_message(),
                        completed: false,
                        aborted: false,
                        resumes,
                    });
                }
            }
        }
    }

    async fn open_resume(&self, url: Url) -> ClientResult<Option<Response>> {
        with_retry(&self.config.retry, || {
            self.open(Method::GET, url.clone(), Option::<&()>::None)
        })
        .await
    }

    async fn open<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> ClientResult<Option<Response>>
    where
        B: Serialize + ?Sized,
    {
        debug!(method = %method, url = %url, "Making HTTP request");

        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, "text/event-stream");
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }

        Ok(Some(response))
    }
}

async fn drain<F>(
    response: Response,
    acc: &mut MessageAccumulator,
    cancel: &CancellationToken,
    observer: &mut F,
) -> ClientResult<Drain>
where
    F: FnMut(&MessageAccumulator),
{
    let bytes = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
    let mut events = EventStream::new(bytes);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Drain::Cancelled),
            next = events.next() => next,
        };

        match next {
            Some(Ok(event)) => {
                let finished = event.is_finish();
                acc.process_event(event);
                observer(acc);
                if finished {
                    return Ok(Drain::Finished);
                }
            }
            Some(Err(error)) => return Err(error.into()),
            None => return Ok(Drain::Ended),
        }
    }
}

fn aborted(acc: MessageAccumulator, resumes: u32) -> StreamOutcome {
    StreamOutcome {
        message: acc.into_message(),
        completed: false,
        aborted: true,
        resumes,
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
