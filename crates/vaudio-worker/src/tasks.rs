//! Registry of running worker tasks.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vaudio_models::JobId;

/// Keeps the `JoinHandle` of every spawned worker, keyed by job id.
#[derive(Debug, Clone, Default)]
pub struct JobTasks {
    handles: Arc<Mutex<HashMap<JobId, JoinHandle<()>>>>,
}

impl JobTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `task` for `job_id` on the runtime.
    pub fn spawn<F>(&self, job_id: JobId, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.prune_finished();
        let handle = tokio::spawn(task);
        if let Some(previous) = self.lock().insert(job_id.clone(), handle) {
            warn!(job_id = %job_id, "Replaced an existing worker handle");
            previous.abort();
        }
    }

    /// Whether a worker for `job_id` is still running.
    pub fn is_running(&self, job_id: &JobId) -> bool {
        self.lock()
            .get(job_id)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Wait for the worker of `job_id`. Returns `false` if none was tracked.
    pub async fn join(&self, job_id: &JobId) -> bool {
        let handle = self.lock().remove(job_id);
        match handle {
            Some(handle) => {
                if let Err(e) = handle.await {
                    warn!(job_id = %job_id, "Worker task ended abnormally: {}", e);
                }
                true
            }
            None => false,
        }
    }

    /// Drop handles of finished workers. Returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let mut handles = self.lock();
        let before = handles.len();
        handles.retain(|_, handle| !handle.is_finished());
        before - handles.len()
    }

    /// Abort every tracked worker. Returns how many were still running.
    pub fn abort_all(&self) -> usize {
        let mut aborted = 0;
        for (job_id, handle) in self.lock().drain() {
            if !handle.is_finished() {
                debug!(job_id = %job_id, "Aborting worker");
                handle.abort();
                aborted += 1;
            }
        }
        aborted
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_spawn_and_join() {
        let tasks = JobTasks::new();
        let id = JobId::new();
        tasks.spawn(id.clone(), async {});

        assert!(tasks.join(&id).await);
        assert!(!tasks.join(&id).await);
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_abort_all() {
        let tasks = JobTasks::new();
        let id = JobId::new();
        tasks.spawn(id.clone(), async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        assert!(tasks.is_running(&id));
        assert_eq!(tasks.abort_all(), 1);
        assert!(!tasks.is_running(&id));
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_prune_finished() {
        let tasks = JobTasks::new();
        let id = JobId::new();
        tasks.spawn(id.clone(), async {});

        for _ in 0..100 {
            if !tasks.is_running(&id) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(tasks.prune_finished(), 1);
        assert_eq!(tasks.len(), 0);
    }
}
