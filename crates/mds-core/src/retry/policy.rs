use std::time::Duration;

/// High-level classification of a fetch failure for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The source asked us to slow down (HTTP 429 or an engine rate-limit
    /// message). Retryable.
    RateLimited,
    /// Any other failure; not retried.
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Bounded retry with a fixed backoff between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Decide whether to retry after the given 1-based attempt failed with
    /// an error of `kind`.
    pub fn decide(&self, attempt: u32, kind: FetchErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        match kind {
            FetchErrorKind::Other => RetryDecision::NoRetry,
            FetchErrorKind::RateLimited => RetryDecision::RetryAfter(self.backoff),
        }
    }
}
