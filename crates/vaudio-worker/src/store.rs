//! In-memory job registry.
//!
//! One mutex guards the whole table. Every operation takes the lock for a
//! single map access and hands out owned snapshots, so callers never hold
//! the guard across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use vaudio_models::{Job, JobId, JobUpdate};

use crate::error::{StoreError, StoreResult};

/// Shared handle to the job table. Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Job>> {
        // Job::apply validates before mutating, so a poisoned table is consistent
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new job.
    pub fn create(&self, job: Job) -> StoreResult<()> {
        let mut jobs = self.lock();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::DuplicateKey(job.id));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    /// Atomically merge `update` into the job.
    ///
    /// Returns `Ok(false)` when the job does not exist (it may have been
    /// downloaded or reaped already). A disallowed status change rejects the
    /// whole update.
    pub fn update(&self, id: &JobId, update: JobUpdate) -> StoreResult<bool> {
        let mut jobs = self.lock();
        match jobs.get_mut(id) {
            Some(job) => {
                job.apply(update)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Snapshot of the job.
    pub fn get(&self, id: &JobId) -> StoreResult<Job> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Remove the job, returning it if it was present.
    pub fn delete(&self, id: &JobId) -> Option<Job> {
        self.lock().remove(id)
    }

    /// Remove and return the job only if its archive is ready.
    ///
    /// Two concurrent callers can never both receive the same job.
    pub fn take_completed(&self, id: &JobId) -> StoreResult<Job> {
        let mut jobs = self.lock();
        match jobs.get(id) {
            Some(job) if job.is_downloadable() => jobs
                .remove(id)
                .ok_or_else(|| StoreError::NotFound(id.clone())),
            _ => Err(StoreError::NotFound(id.clone())),
        }
    }

    /// Ids of terminal jobs not touched for at least `ttl`.
    pub fn expired(&self, ttl: Duration) -> Vec<JobId> {
        let now = Utc::now();
        self.lock()
            .values()
            .filter(|job| job.is_terminal())
            .filter(|job| {
                now.signed_duration_since(job.updated_at)
                    .to_std()
                    .map(|age| age >= ttl)
                    .unwrap_or(false)
            })
            .map(|job| job.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
