//! Background removal of finished jobs nobody downloaded.
//!
//! Terminal jobs stay in the store until their archive is downloaded. The
//! reaper sweeps periodically and deletes those whose last update is older
//! than the configured TTL, together with their scratch directories.
//! Pending and running jobs are never touched.

use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info};

use crate::metrics;
use crate::store::JobStore;
use crate::workspace::remove_scratch_dir;

/// Job reaper service.
#[derive(Debug, Clone)]
pub struct JobReaper {
    store: JobStore,
    ttl: Duration,
    interval: Duration,
    enabled: bool,
}

impl JobReaper {
    pub fn new(store: JobStore, ttl: Duration, interval: Duration) -> Self {
        Self {
            store,
            ttl,
            interval,
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Start the background sweep loop.
    ///
    /// Runs indefinitely; spawn it as a background task.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Job reaper is disabled");
            return;
        }

        info!(
            "Starting job reaper (ttl: {:?}, interval: {:?})",
            self.ttl, self.interval
        );

        let mut ticker = interval(self.interval.max(Duration::from_millis(1)));

        loop {
            ticker.tick().await;
            self.check_once().await;
        }
    }

    /// Run a single sweep. Returns the number of jobs reaped.
    pub async fn check_once(&self) -> usize {
        let expired = self.store.expired(self.ttl);
        if expired.is_empty() {
            return 0;
        }

        let mut reaped = 0;
        for job_id in expired {
            // Downloaded between the scan and now
            let Some(job) = self.store.delete(&job_id) else {
                continue;
            };

            debug!(job_id = %job_id, status = %job.status, "Reaping expired job");
            if let Some(dir) = &job.temp_dir {
                remove_scratch_dir(dir).await;
            }
            reaped += 1;
        }

        if reaped > 0 {
            metrics::record_jobs_reaped(reaped);
            info!("Job reaper removed {} expired job(s)", reaped);
        }

        reaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaudio_models::{Job, JobId, JobStatus, JobUpdate};

    fn finished_job(store: &JobStore, temp_dir: &std::path::Path) -> JobId {
        let job = Job::new(JobId::new(), 1).with_temp_dir(temp_dir);
        let id = job.id.clone();
        store.create(job).unwrap();
        store
            .update(&id, JobUpdate::new().status(JobStatus::Running))
            .unwrap();
        store
            .update(&id, JobUpdate::new().status(JobStatus::Failed))
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_reaps_expired_terminal_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("convert_job_x");
        std::fs::create_dir_all(scratch.join("outputs")).unwrap();

        let store = JobStore::new();
        let id = finished_job(&store, &scratch);

        let running = Job::new(JobId::new(), 1);
        let running_id = running.id.clone();
        store.create(running).unwrap();
        store
            .update(&running_id, JobUpdate::new().status(JobStatus::Running))
            .unwrap();

        let reaper = JobReaper::new(store.clone(), Duration::ZERO, Duration::from_secs(60));
        assert_eq!(reaper.check_once().await, 1);

        assert!(store.get(&id).is_err());
        assert!(store.get(&running_id).is_ok());
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn test_keeps_fresh_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new();
        let id = finished_job(&store, dir.path());

        let reaper = JobReaper::new(store.clone(), Duration::from_secs(3600), Duration::from_secs(60));
        assert_eq!(reaper.check_once().await, 0);
        assert!(store.get(&id).is_ok());
    }
}
