//! Job runner: drives one job end-to-end in its own task.
//!
//! Each accepted request gets exactly one spawned task. The task is the
//! job's single writer: it streams engine progress into the store, applies
//! the bounded retry policy for rate-limited failures, finalizes the
//! artifact, and converts any fault into the job's terminal error state so
//! nothing escapes the task boundary.

mod finalize;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::fetch::{FetchEngine, FetchOutcome, FetchSpec, ProgressEvent};
use crate::job::{JobId, JobStatus, JobStore};
use crate::retry::{self, RetryDecision, RetryPolicy};

/// Per-process settings the runner needs for every job.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Directory the engine writes artifacts into.
    pub download_dir: PathBuf,
    pub retry: RetryPolicy,
}

/// Spawns the task that runs job `id` to a terminal state.
///
/// The handle is returned for tests; the serving path drops it and tracks
/// the job only through the store.
pub fn spawn(
    store: Arc<JobStore>,
    engine: Arc<dyn FetchEngine>,
    settings: RunnerSettings,
    id: JobId,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = run_job(&store, engine.as_ref(), &settings, id).await {
            tracing::warn!(job = %id, error = %format!("{err:#}"), "job failed");
            store.update(id, |job| {
                job.status = JobStatus::Error;
                job.error = Some(format!("{err:#}"));
            });
        }
    })
}

/// One job, admission to terminal state. Any `Err` is turned into the
/// job's `error` status by the spawn wrapper.
async fn run_job(
    store: &Arc<JobStore>,
    engine: &dyn FetchEngine,
    settings: &RunnerSettings,
    id: JobId,
) -> Result<()> {
    let request = store
        .get(id)
        .context("job missing from store at start")?
        .request;

    store.update(id, |job| job.status = JobStatus::Downloading);

    let spec = FetchSpec {
        url: request.url.clone(),
        kind: request.kind,
        resolution: request.resolution,
        output_template: settings.download_dir.join(format!("{id}.%(ext)s")),
    };

    let outcome = fetch_with_retry(store, engine, &settings.retry, id, &spec).await?;

    // Raw retrieval is done; pin progress at 100 while finalization runs.
    store.update(id, |job| {
        if job.status == JobStatus::Downloading {
            job.status = JobStatus::Processing;
        }
        job.progress = 100.0;
    });

    finalize::finalize(store, settings, id, &request, &outcome).await
}

/// Runs fetch attempts under the retry policy. Rate-limited failures are
/// retried after the fixed backoff; anything else, or exhaustion of the
/// attempt budget, propagates the engine's message.
async fn fetch_with_retry(
    store: &Arc<JobStore>,
    engine: &dyn FetchEngine,
    policy: &RetryPolicy,
    id: JobId,
    spec: &FetchSpec,
) -> Result<FetchOutcome> {
    let mut attempt = 1u32;
    loop {
        let (events_tx, events_rx) = mpsc::channel::<ProgressEvent>(16);
        let pump = tokio::spawn(pump_progress(Arc::clone(store), id, events_rx));

        let result = engine.fetch(spec, events_tx).await;
        // The sender is dropped by now, so the pump drains and exits.
        pump.await.context("progress pump join")?;

        match result {
            Ok(outcome) => return Ok(outcome),
            Err(err) => {
                let kind = retry::classify(&err);
                match policy.decide(attempt, kind) {
                    RetryDecision::RetryAfter(delay) => {
                        tracing::warn!(
                            job = %id,
                            attempt,
                            delay_secs = delay.as_secs(),
                            "fetch rate-limited, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    RetryDecision::NoRetry => {
                        return Err(err).context("fetch failed");
                    }
                }
            }
        }
    }
}

/// Applies engine progress events to the store: clamped to [0, 100] and
/// non-decreasing, so pollers see a monotone display value. A sample that
/// would move backwards is dropped.
async fn pump_progress(
    store: Arc<JobStore>,
    id: JobId,
    mut events: mpsc::Receiver<ProgressEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ProgressEvent::Downloading { percent } => {
                if !percent.is_finite() {
                    tracing::debug!(job = %id, percent, "dropping malformed progress sample");
                    continue;
                }
                let percent = percent.clamp(0.0, 100.0);
                store.update(id, |job| {
                    if percent > job.progress {
                        job.progress = percent;
                    }
                });
            }
            ProgressEvent::Finished => {
                store.update(id, |job| {
                    if job.status == JobStatus::Downloading {
                        job.status = JobStatus::Processing;
                    }
                    job.progress = 100.0;
                });
            }
        }
    }
}
