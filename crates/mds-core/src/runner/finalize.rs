//! Post-fetch finalization: confirm the artifact and record its identity.
//!
//! Engine success is not trusted as proof of a retrievable file; the
//! expected output path is checked before the job is marked completed.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::fetch::FetchOutcome;
use crate::job::{DownloadRequest, JobId, JobStatus, JobStore};
use crate::name;

use super::RunnerSettings;

/// Locates the finished artifact, derives its display name, and moves the
/// job to `completed`. The output path is deterministic (`<dir>/<id>.<ext>`)
/// because the engine is asked for a fixed codec/container per kind.
pub(super) async fn finalize(
    store: &Arc<JobStore>,
    settings: &RunnerSettings,
    id: JobId,
    request: &DownloadRequest,
    outcome: &FetchOutcome,
) -> Result<()> {
    let ext = request.kind.extension();
    let result_path = settings.download_dir.join(format!("{id}.{ext}"));

    let present = tokio::fs::try_exists(&result_path).await.unwrap_or(false);
    if !present {
        bail!("result file missing");
    }

    let display_name =
        name::derive_display_name(request.filename.as_deref(), outcome.title.as_deref(), request.kind);

    tracing::info!(job = %id, path = %result_path.display(), name = %display_name, "job completed");
    store.update(id, |job| {
        job.status = JobStatus::Completed;
        job.progress = 100.0;
        job.result_path = Some(result_path.clone());
        job.display_name = Some(display_name.clone());
    });

    Ok(())
}
