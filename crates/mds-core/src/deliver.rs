//! Delivery gate: one-shot file handoff with guaranteed cleanup.
//!
//! Claiming a completed job takes its `result_path` out of the store in a
//! single critical section (exchange-and-clear), so exactly one caller wins
//! even when two first-time deliveries race. The winner gets an open file
//! handle; the backing file is unlinked immediately, which on Unix keeps
//! the handle readable while guaranteeing the disk space is reclaimed no
//! matter how the transfer itself ends.

use tokio::fs::File;

use crate::job::{JobId, JobStore};

/// Why a delivery attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliverError {
    /// Unknown job id.
    #[error("job not found")]
    NotFound,
    /// The job has not reached `completed`.
    #[error("job not ready")]
    NotReady,
    /// The artifact no longer exists (already delivered or removed).
    #[error("file gone")]
    Gone,
}

/// A claimed artifact, ready to stream. The backing file is already
/// unlinked; dropping `file` releases the last reference to its bytes.
#[derive(Debug)]
pub struct Delivery {
    pub file: File,
    pub display_name: String,
    pub len: u64,
}

/// Claims the finished artifact of `id` for delivery.
///
/// Fails with `NotFound` for unknown ids, `NotReady` before `completed`,
/// and `Gone` once the artifact has been claimed or removed. On success the
/// job's terminal status stays in the store but its file is gone, so a
/// repeated attempt observes `Gone` cleanly.
pub async fn claim(store: &JobStore, id: JobId) -> Result<Delivery, DeliverError> {
    let (path, display_name) = store.claim_result(id)?;

    let file = match File::open(&path).await {
        Ok(f) => f,
        Err(err) => {
            tracing::warn!(job = %id, path = %path.display(), error = %err, "completed artifact unreadable");
            return Err(DeliverError::Gone);
        }
    };
    let len = file.metadata().await.map_err(|_| DeliverError::Gone)?.len();

    // Unlink before serving: cleanup must not depend on transfer success.
    if let Err(err) = tokio::fs::remove_file(&path).await {
        tracing::warn!(job = %id, path = %path.display(), error = %err, "failed to remove delivered artifact");
    }
    tracing::info!(job = %id, name = %display_name, len, "artifact claimed for delivery");

    Ok(Delivery {
        file,
        display_name,
        len,
    })
}
