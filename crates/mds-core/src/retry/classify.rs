//! Classify fetch errors into retry policy error kinds.

use crate::fetch::FetchError;
use crate::retry::policy::FetchErrorKind;

/// Classify a fetch error into a retry kind.
pub fn classify(e: &FetchError) -> FetchErrorKind {
    match e {
        FetchError::RateLimited(_) => FetchErrorKind::RateLimited,
        FetchError::Engine(_) | FetchError::Spawn(_) => FetchErrorKind::Other,
    }
}

/// Heuristic over the engine's diagnostic output: does this look like a
/// rate-limit rejection? Matches the HTTP 429 status and the common
/// wording yt-dlp forwards from extractors.
pub fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("429")
        || lower.contains("rate-limit")
        || lower.contains("rate limit")
        || lower.contains("too many requests")
}
