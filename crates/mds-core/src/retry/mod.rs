//! Retry and backoff policy for fetch failures.
//!
//! Encapsulates failure classification (rate-limiting vs everything else)
//! and the bounded-retry decision so the runner can apply one consistent
//! policy across attempts.

mod classify;
mod policy;

pub use classify::{classify, is_rate_limit_message};
pub use policy::{FetchErrorKind, RetryDecision, RetryPolicy};
