//! Scripted fetch engine for lifecycle tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use mds_core::fetch::{FetchEngine, FetchError, FetchOutcome, FetchSpec, ProgressEvent};

/// One scripted fetch attempt.
pub enum Step {
    /// Fail with a rate-limit signal.
    RateLimited(&'static str),
    /// Fail with a non-retryable engine error.
    Fail(&'static str),
    /// Emit the given progress samples, optionally write the output file,
    /// then report success.
    Succeed {
        title: Option<&'static str>,
        progress: Vec<f64>,
        write_file: bool,
    },
}

/// Fetch engine that replays a fixed script, one step per attempt.
pub struct ScriptedEngine {
    steps: Mutex<VecDeque<Step>>,
    attempts: AtomicU32,
}

impl ScriptedEngine {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Expands the engine-style output template into the concrete path for
/// this fetch's media kind.
pub fn resolve_output_path(spec: &FetchSpec) -> std::path::PathBuf {
    let template = spec.output_template.to_string_lossy();
    std::path::PathBuf::from(template.replace("%(ext)s", spec.kind.extension()))
}

#[async_trait]
impl FetchEngine for ScriptedEngine {
    async fn fetch(
        &self,
        spec: &FetchSpec,
        events: mpsc::Sender<ProgressEvent>,
    ) -> Result<FetchOutcome, FetchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            None => Err(FetchError::Engine("script exhausted".to_string())),
            Some(Step::RateLimited(msg)) => Err(FetchError::RateLimited(msg.to_string())),
            Some(Step::Fail(msg)) => Err(FetchError::Engine(msg.to_string())),
            Some(Step::Succeed {
                title,
                progress,
                write_file,
            }) => {
                for percent in progress {
                    let _ = events.send(ProgressEvent::Downloading { percent }).await;
                }
                if write_file {
                    tokio::fs::write(resolve_output_path(spec), b"artifact")
                        .await
                        .map_err(FetchError::Spawn)?;
                }
                let _ = events.send(ProgressEvent::Finished).await;
                Ok(FetchOutcome {
                    title: title.map(str::to_string),
                })
            }
        }
    }
}
