//! yt-dlp engine: drives the external binary and parses its line output.
//!
//! The child is run with `--newline` and a fixed `--progress-template` so
//! stdout becomes a parseable line protocol; the resolved title is printed
//! after the final move with `--print`. Stderr is drained concurrently and
//! kept for the error message when the child exits non-zero.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::job::MediaKind;
use crate::retry::is_rate_limit_message;

use super::{FetchEngine, FetchError, FetchOutcome, FetchSpec, ProgressEvent};

const PROGRESS_PREFIX: &str = "mds-progress";
const TITLE_PREFIX: &str = "mds-title";

/// Target bitrate for audio extraction.
const AUDIO_QUALITY: &str = "192K";

/// Fetch engine backed by the `yt-dlp` binary.
pub struct YtDlpEngine {
    binary: String,
}

impl YtDlpEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

/// Format selection per media kind, mirroring the adapter contract:
/// best-audio with mp3 extraction, or best-video-at-or-below-height merged
/// with best-audio into mp4.
fn apply_format_args(cmd: &mut Command, spec: &FetchSpec) {
    match spec.kind {
        MediaKind::Audio => {
            cmd.args(["-f", "bestaudio", "-x", "--audio-format", "mp3"]);
            cmd.args(["--audio-quality", AUDIO_QUALITY]);
        }
        MediaKind::Video => {
            let format = match spec.resolution {
                Some(height) => format!("bestvideo[height<={height}]+bestaudio/best"),
                None => "bestvideo+bestaudio/best".to_string(),
            };
            cmd.arg("-f").arg(format);
            cmd.args(["--merge-output-format", "mp4"]);
        }
    }
}

/// Parses one progress line (`mds-progress  42.1%`) into a percentage.
/// Returns `None` for anything else, including malformed samples.
fn parse_progress_line(line: &str) -> Option<f64> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    rest.trim().trim_end_matches('%').trim().parse::<f64>().ok()
}

/// Parses the title line (`mds-title Some Title`).
fn parse_title_line(line: &str) -> Option<String> {
    let rest = line.trim().strip_prefix(TITLE_PREFIX)?;
    let title = rest.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Drains stdout, forwarding progress events and capturing the title.
async fn consume_stdout(
    stdout: impl AsyncRead + Unpin,
    events: &mpsc::Sender<ProgressEvent>,
) -> Option<String> {
    let mut title = None;
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(percent) = parse_progress_line(&line) {
            // Receiver gone means the consumer stopped caring; keep
            // draining so the child doesn't block on a full pipe.
            let _ = events.send(ProgressEvent::Downloading { percent }).await;
        } else if let Some(t) = parse_title_line(&line) {
            title = Some(t);
        } else if line.trim().starts_with(PROGRESS_PREFIX) {
            tracing::debug!(line = %line, "ignoring malformed progress sample");
        }
    }
    title
}

/// A `wait()` failure is an engine-side fault, not a spawn failure;
/// reported as non-retryable with its own wording.
fn wait_failure(err: std::io::Error) -> FetchError {
    FetchError::Engine(format!("engine wait failed: {err}"))
}

/// Collects stderr lines into one diagnostic string.
async fn collect_stderr(stderr: impl AsyncRead + Unpin) -> String {
    let mut out = String::new();
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&line);
    }
    out
}

#[async_trait]
impl FetchEngine for YtDlpEngine {
    async fn fetch(
        &self,
        spec: &FetchSpec,
        events: mpsc::Sender<ProgressEvent>,
    ) -> Result<FetchOutcome, FetchError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--newline")
            .arg("--no-simulate")
            .arg("--progress-template")
            .arg(format!("download:{PROGRESS_PREFIX} %(progress._percent_str)s"))
            .arg("--print")
            .arg(format!("after_move:{TITLE_PREFIX} %(title)s"));
        apply_format_args(&mut cmd, spec);
        cmd.arg("-o").arg(&spec.output_template);
        cmd.arg(&spec.url);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!(url = %spec.url, template = %spec.output_template.display(), "spawning yt-dlp");
        let mut child = cmd.spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetchError::Engine("engine stderr unavailable".to_string()))?;
        let stderr_task = tokio::spawn(collect_stderr(stderr));

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::Engine("engine stdout unavailable".to_string()))?;
        let title = consume_stdout(stdout, &events).await;

        let status = child.wait().await.map_err(wait_failure)?;
        let diagnostics = stderr_task.await.unwrap_or_default();

        if status.success() {
            let _ = events.send(ProgressEvent::Finished).await;
            return Ok(FetchOutcome { title });
        }

        let message = if diagnostics.is_empty() {
            format!("engine exited with {status}")
        } else {
            diagnostics
        };
        if is_rate_limit_message(&message) {
            Err(FetchError::RateLimited(message))
        } else {
            Err(FetchError::Engine(message))
        }
    }
}
