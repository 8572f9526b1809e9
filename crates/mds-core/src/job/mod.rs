//! Job data model: identifiers, status, request, and poller-visible snapshots.

mod store;

pub use store::JobStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Opaque unique identifier for one download job. Generated at allocation,
/// never reused, and the only key into the [`JobStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an id from its string form (e.g. a URL path segment).
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What kind of artifact the caller wants out of the source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Extension of the finished artifact. Fixed because the engine is asked
    /// for mp3 extraction (audio) or an mp4 merge (video).
    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Audio => "mp3",
            MediaKind::Video => "mp4",
        }
    }
}

/// Immutable input of one job, validated at admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Source URL handed to the fetch engine.
    pub url: String,
    pub kind: MediaKind,
    /// Height cap for video requests; `None` selects best available.
    pub resolution: Option<u32>,
    /// Caller-requested base name for the delivered file (unsanitized).
    pub filename: Option<String>,
}

/// Lifecycle of a job. `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Downloading,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// Mutable state of one job. Written only by the job's own runner task
/// (and, for `result_path`, consumed once by the delivery gate).
#[derive(Debug)]
pub struct Job {
    pub request: DownloadRequest,
    pub status: JobStatus,
    /// Percentage in [0, 100]; non-decreasing while the job runs.
    pub progress: f64,
    /// Absolute path of the finished artifact. Populated only once the file
    /// is confirmed present on disk; taken by the delivery gate.
    pub result_path: Option<PathBuf>,
    /// Name presented to the client on download.
    pub display_name: Option<String>,
    /// Human-readable cause, set only in the `Error` state.
    pub error: Option<String>,
}

impl Job {
    pub fn new(request: DownloadRequest) -> Self {
        Self {
            request,
            status: JobStatus::Starting,
            progress: 0.0,
            result_path: None,
            display_name: None,
            error: None,
        }
    }
}

/// Owned copy of a job's poller-visible state. A snapshot is taken in a
/// single critical section, so its fields are never torn.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub request: DownloadRequest,
    pub status: JobStatus,
    pub progress: f64,
    pub result_path: Option<PathBuf>,
    pub display_name: Option<String>,
    pub error: Option<String>,
}

impl From<&Job> for JobSnapshot {
    fn from(job: &Job) -> Self {
        Self {
            request: job.request.clone(),
            status: job.status,
            progress: job.progress,
            result_path: job.result_path.clone(),
            display_name: job.display_name.clone(),
            error: job.error.clone(),
        }
    }
}
