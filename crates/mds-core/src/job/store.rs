//! Concurrency-safe job state table.
//!
//! The store is the only shared mutable structure between the HTTP surface
//! and the per-job runner tasks. Every access is a short critical section
//! around a field copy or update; the lock is never held across I/O.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::deliver::DeliverError;

use super::{DownloadRequest, Job, JobId, JobSnapshot, JobStatus};

/// Shared registry of job id -> job state. Pollers read snapshots; each
/// runner task is the single writer for its own job.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh job (`starting`, progress 0) and returns its id.
    pub fn allocate(&self, request: DownloadRequest) -> JobId {
        let id = JobId::new();
        self.jobs.write().unwrap().insert(id, Job::new(request));
        id
    }

    /// Copies the current state of a job. Returns `None` for unknown ids.
    pub fn get(&self, id: JobId) -> Option<JobSnapshot> {
        self.jobs.read().unwrap().get(&id).map(JobSnapshot::from)
    }

    /// Applies a mutation to a job inside one critical section, so pollers
    /// never observe a torn combination of fields. Returns false for
    /// unknown ids.
    pub fn update(&self, id: JobId, f: impl FnOnce(&mut Job)) -> bool {
        self.with_mut(id, f).is_some()
    }

    /// Like [`update`](Self::update) but returns the closure's value.
    pub fn with_mut<R>(&self, id: JobId, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        self.jobs.write().unwrap().get_mut(&id).map(f)
    }

    /// Exchange-and-clear claim used by the delivery gate: takes the result
    /// path out of a completed job in one critical section, so exactly one
    /// of any number of racing claimants wins; the rest observe `Gone`.
    /// The display name falls back to the id.
    pub fn claim_result(&self, id: JobId) -> Result<(PathBuf, String), DeliverError> {
        self.with_mut(id, |job| match job.status {
            JobStatus::Completed => {
                let path = job.result_path.take().ok_or(DeliverError::Gone)?;
                let name = job
                    .display_name
                    .clone()
                    .unwrap_or_else(|| id.to_string());
                Ok((path, name))
            }
            _ => Err(DeliverError::NotReady),
        })
        .ok_or(DeliverError::NotFound)?
    }

    /// Number of jobs ever allocated in this process.
    pub fn len(&self) -> usize {
        self.jobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
