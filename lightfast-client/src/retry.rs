//! Retry policy for opening stream connections.

use crate::error::{ClientError, ClientResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// How long to wait between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Constant delay.
    Fixed(Duration),
    /// Exponential backoff.
    Exponential {
        /// Delay before the first retry.
        initial: Duration,
        /// Upper bound on any single delay.
        max: Duration,
        /// Growth factor per attempt.
        multiplier: f64,
    },
    /// Exponential backoff with random jitter.
    ExponentialJitter {
        /// Delay before the first retry.
        initial: Duration,
        /// Upper bound on any single delay.
        max: Duration,
        /// Growth factor per attempt.
        multiplier: f64,
        /// Jitter factor (0.0 to 1.0).
        jitter: f64,
    },
}

impl Backoff {
    /// Delay before retry number `attempt` (1-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(d) => *d,
            Backoff::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let delay = exponential(*initial, *multiplier, attempt);
                Duration::from_secs_f64(delay.min(max.as_secs_f64()))
            }
            Backoff::ExponentialJitter {
                initial,
                max,
                multiplier,
                jitter,
            } => {
                let base = exponential(*initial, *multiplier, attempt);
                let delay = (base + base * jitter * random_jitter()).max(0.0);
                Duration::from_secs_f64(delay.min(max.as_secs_f64()))
            }
        }
    }
}

fn exponential(initial: Duration, multiplier: f64, attempt: u32) -> f64 {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    initial.as_secs_f64() * multiplier.powi(exponent)
}

/// Generate a random jitter factor between -1.0 and 1.0.
fn random_jitter() -> f64 {
    use rand::Rng;
    rand::thread_rng().gen_range(-1.0..1.0)
}

/// Retry behaviour for connection attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Wait between attempts.
    pub backoff: Backoff,
    /// Upper bound when honouring a server `Retry-After`.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::ExponentialJitter {
                initial: Duration::from_millis(500),
                max: Duration::from_secs(30),
                multiplier: 2.0,
                jitter: 0.1,
            },
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Create the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a policy that never retries.
    pub fn no_retry() -> Self {
        Self::new().max_retries(0)
    }

    /// Set max retries.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set the backoff.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Use a fixed delay.
    pub fn fixed(self, delay: Duration) -> Self {
        self.backoff(Backoff::Fixed(delay))
    }

    /// Use exponential backoff.
    pub fn exponential(self, initial: Duration, max: Duration) -> Self {
        self.backoff(Backoff::Exponential {
            initial,
            max,
            multiplier: 2.0,
        })
    }

    /// Cap how long a server `Retry-After` may make us wait.
    pub fn max_retry_after(mut self, max: Duration) -> Self {
        self.max_retry_after = max;
        self
    }

    /// Delay before retry number `attempt`, preferring the server's hint.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after
            .map(|d| d.min(self.max_retry_after))
            .unwrap_or_else(|| self.backoff.delay(attempt))
    }
}

/// Run `operation` until it succeeds, fails permanently, or retries run out.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> ClientResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    let max_attempts = policy.max_retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= max_attempts || !error.is_retryable() {
                    warn!(
                        attempt,
                        error = %error,
                        "Retry exhausted or error not retryable"
                    );
                    return Err(error);
                }

                let wait = policy.delay(attempt, error.retry_after());
                debug!(
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    error = %error,
                    "Waiting before retry"
                );
                sleep(wait).await;
            }
        }
    }
}
