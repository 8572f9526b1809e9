//! Fetch adapter: uniform interface over the external media-extraction engine.
//!
//! The engine is a black box. The runner hands it a URL and an output
//! policy, watches a typed stream of progress events, and gets back a
//! terminal result. Nothing above this module knows how the bytes are
//! actually retrieved.

mod ytdlp;

pub use ytdlp::YtDlpEngine;

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::job::MediaKind;

/// One fetch as the engine sees it. The output template is a pattern
/// (`<dir>/<job-id>.%(ext)s`), deterministic per job id so two jobs'
/// outputs can never collide.
#[derive(Debug, Clone)]
pub struct FetchSpec {
    pub url: String,
    pub kind: MediaKind,
    /// Height cap for video; ignored for audio.
    pub resolution: Option<u32>,
    pub output_template: PathBuf,
}

/// Discrete progress report from the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    /// Retrieval underway; `percent` is the engine's own estimate and may
    /// be malformed upstream, so consumers clamp it.
    Downloading { percent: f64 },
    /// Raw retrieval done; local post-processing may still follow.
    Finished,
}

/// Terminal failure of one fetch attempt.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The engine binary could not be started.
    #[error("failed to start fetch engine: {0}")]
    Spawn(#[from] std::io::Error),
    /// The source signalled rate-limiting; retryable.
    #[error("rate-limited: {0}")]
    RateLimited(String),
    /// Any other engine failure; not retryable.
    #[error("{0}")]
    Engine(String),
}

/// What a successful fetch reports back besides the file itself.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Source title, used as the display-name fallback when the caller
    /// didn't request a name.
    pub title: Option<String>,
}

/// Abstraction over the external media-retrieval engine.
///
/// Implementations send [`ProgressEvent`]s while working and return a
/// terminal result. Dropping the event sender is how the consumer learns
/// the stream ended.
#[async_trait]
pub trait FetchEngine: Send + Sync + 'static {
    async fn fetch(
        &self,
        spec: &FetchSpec,
        events: mpsc::Sender<ProgressEvent>,
    ) -> Result<FetchOutcome, FetchError>;
}
