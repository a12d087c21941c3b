//! Client configuration.

use crate::error::ClientResult;
use crate::retry::RetryPolicy;
use std::time::Duration;
use url::Url;

/// Configuration for [`ResumableStreamClient`](crate::ResumableStreamClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin of the chat backend, e.g. `https://app.lightfast.ai`.
    pub base_url: Url,
    /// Path of the chat endpoint. Resume requests go to `{chat_path}/{chat_id}/stream`.
    pub chat_path: String,
    /// Bearer token sent as `Authorization`.
    pub bearer_token: Option<String>,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// Retry policy for opening a connection.
    pub retry: RetryPolicy,
    /// How many times a dropped stream is re-attached before giving up.
    pub max_resumes: u32,
}

impl ClientConfig {
    /// Create a config for the given backend origin.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            chat_path: "/api/chat".to_string(),
            bearer_token: None,
            headers: Vec::new(),
            connect_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            max_resumes: 3,
        })
    }

    /// Set the chat endpoint path.
    pub fn with_chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }

    /// Set the bearer token.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Add a header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set how many times a dropped stream is resumed.
    pub fn with_max_resumes(mut self, n: u32) -> Self {
        self.max_resumes = n;
        self
    }

    /// URL that starts a new response.
    pub fn chat_url(&self) -> ClientResult<Url> {
        Ok(self.base_url.join(&self.chat_path)?)
    }

    /// URL that re-attaches to the active response of `chat_id`.
    pub fn resume_url(&self, chat_id: &str) -> ClientResult<Url> {
        let mut url = self.chat_url()?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend([chat_id, "stream"]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("https://app.lightfast.ai").unwrap();
        assert_eq!(config.chat_path, "/api/chat");
        assert_eq!(config.max_resumes, 3);
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("http://localhost:3000")
            .unwrap()
            .with_chat_path("/api/v1/chat")
            .with_bearer_token("tok")
            .with_header("x-lightfast-session", "s1")
            .with_connect_timeout(Duration::from_secs(2))
            .with_retry(RetryPolicy::no_retry())
            .with_max_resumes(0);

        assert_eq!(config.chat_path, "/api/v1/chat");
        assert_eq!(config.bearer_token.as_deref(), Some("tok"));
        assert_eq!(config.headers.len(), 1);
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.max_resumes, 0);
    }

    #[test]
    fn test_urls() {
        let config = ClientConfig::new("https://app.lightfast.ai").unwrap();
        assert_eq!(
            config.chat_url().unwrap().as_str(),
            "https://app.lightfast.ai/api/chat"
        );
        assert_eq!(
            config.resume_url("thread-1").unwrap().as_str(),
            "https://app.lightfast.ai/api/chat/thread-1/stream"
        );
    }

    #[test]
    fn test_resume_url_escapes_chat_id() {
        let config = ClientConfig::new("https://app.lightfast.ai").unwrap();
        assert_eq!(
            config.resume_url("a/b").unwrap().as_str(),
            "https://app.lightfast.ai/api/chat/a%2Fb/stream"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ClientConfig::new("not a url").is_err());
    }
}
