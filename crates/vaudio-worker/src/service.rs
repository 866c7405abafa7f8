//! Job submission, polling and download.
//!
//! [`ConversionService`] is what the HTTP layer talks to. It owns the
//! [`JobStore`], the [`JobTasks`] registry and the converter, and turns a set
//! of saved uploads into a running job.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn, Instrument};
use vaudio_media::{FfmpegAudioExtractor, MediaConverter};
use vaudio_models::{is_supported_video, to_posix, Job, JobId, JobStatus, JobUpdate};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::store::JobStore;
use crate::tasks::JobTasks;
use crate::worker::{ConversionWorker, QueuedFile, MSG_PREPARING};
use crate::workspace::{remove_scratch_dir, JobWorkspace};

pub const NO_FILES_UPLOADED: &str = "No files were uploaded.";
pub const NO_SUPPORTED_FILES: &str = "No supported video files were uploaded.";

/// A completed job handed out for download.
///
/// The job is already gone from the store; the caller streams `archive_path`
/// and then calls [`ConversionService::discard`].
#[derive(Debug, Clone)]
pub struct Download {
    pub job_id: JobId,
    pub archive_path: PathBuf,
    pub scratch_dir: Option<PathBuf>,
}

/// Conversion job service.
#[derive(Clone)]
pub struct ConversionService {
    config: Arc<WorkerConfig>,
    store: JobStore,
    tasks: JobTasks,
    converter: Arc<dyn MediaConverter>,
}

impl ConversionService {
    /// Create a service backed by FFmpeg, configured from `config`.
    pub fn new(config: WorkerConfig) -> Self {
        let extractor = FfmpegAudioExtractor::new(config.audio_format)
            .with_bitrate(config.audio_bitrate.clone())
            .with_timeout(config.conversion_timeout.as_secs());
        Self::with_converter(config, Arc::new(extractor))
    }

    /// Create a service with a custom converter.
    pub fn with_converter(config: WorkerConfig, converter: Arc<dyn MediaConverter>) -> Self {
        Self {
            config: Arc::new(config),
            store: JobStore::new(),
            tasks: JobTasks::new(),
            converter,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn tasks(&self) -> &JobTasks {
        &self.tasks
    }

    pub fn converter(&self) -> &Arc<dyn MediaConverter> {
        &self.converter
    }

    /// Allocate a job id and its scratch directory for incoming uploads.
    pub async fn open_workspace(&self) -> WorkerResult<JobWorkspace> {
        Ok(JobWorkspace::create(&self.config.work_dir, JobId::new()).await?)
    }

    /// Turn the uploads saved in `workspace` into a job and start its worker.
    ///
    /// `uploads` are the sanitized relative paths, in upload order. On
    /// rejection the workspace is removed and no job is created.
    pub async fn submit(&self, workspace: JobWorkspace, uploads: Vec<PathBuf>) -> WorkerResult<JobId> {
        let mut seen = HashSet::new();
        let uploads: Vec<PathBuf> = uploads
            .into_iter()
            .filter(|path| seen.insert(path.clone()))
            .collect();

        if uploads.is_empty() {
            workspace.remove().await;
            return Err(WorkerError::invalid_upload(NO_FILES_UPLOADED));
        }

        let (supported, unsupported): (Vec<PathBuf>, Vec<PathBuf>) =
            uploads.into_iter().partition(|path| is_supported_video(path));
        let mut unsupported: Vec<String> = unsupported.iter().map(to_posix).collect();
        unsupported.sort();

        if supported.is_empty() {
            workspace.remove().await;
            return Err(WorkerError::InvalidUpload {
                message: NO_SUPPORTED_FILES.to_string(),
                unsupported_files: unsupported,
            });
        }

        let job_id = workspace.job_id().clone();
        let files: Vec<QueuedFile> = supported
            .into_iter()
            .map(|relative| QueuedFile::new(workspace.upload_path(&relative), relative))
            .collect();
        let total = files.len() as u32;

        let job = Job::new(job_id.clone(), total)
            .with_temp_dir(workspace.root())
            .with_unsupported_files(unsupported)
            .with_message(MSG_PREPARING);

        if let Err(e) = self.store.create(job) {
            workspace.remove().await;
            return Err(e.into());
        }

        metrics::record_job_submitted(total);
        info!(job_id = %job_id, total_files = total, "Conversion job submitted");

        let worker = ConversionWorker::new(self.store.clone(), Arc::clone(&self.converter));
        let store = self.store.clone();
        let task_id = job_id.clone();
        let output_dir = workspace.outputs_dir();
        let span = JobLogger::new(&job_id, files.len()).span();

        let task = async move {
            if let Err(e) = worker.run(&task_id, files, &output_dir).await {
                error!(job_id = %task_id, "Conversion worker error: {}", e);
                metrics::record_job_failed("internal");
                mark_failed(&store, &task_id, &e.to_string());
            }
        };
        self.tasks.spawn(job_id.clone(), task.instrument(span));

        Ok(job_id)
    }

    /// Snapshot of a job.
    pub fn status(&self, job_id: &JobId) -> WorkerResult<Job> {
        self.store
            .get(job_id)
            .map_err(|_| WorkerError::NotFound(job_id.clone()))
    }

    /// Claim a completed job's archive. Succeeds at most once per job.
    pub fn take_download(&self, job_id: &JobId) -> WorkerResult<Download> {
        let job = self
            .store
            .take_completed(job_id)
            .map_err(|_| WorkerError::NotFound(job_id.clone()))?;

        let archive_path = job
            .download_path
            .ok_or_else(|| WorkerError::NotFound(job_id.clone()))?;

        Ok(Download {
            job_id: job.id,
            archive_path,
            scratch_dir: job.temp_dir,
        })
    }

    /// Remove what a download left behind.
    pub async fn discard(&self, download: &Download) {
        self.tasks.prune_finished();
        if let Some(dir) = &download.scratch_dir {
            remove_scratch_dir(dir).await;
        }
    }

    /// Abort all in-flight workers.
    pub fn shutdown(&self) -> usize {
        let aborted = self.tasks.abort_all();
        if aborted > 0 {
            info!(aborted, "Aborted in-flight conversion workers");
        }
        aborted
    }
}

/// Force a job whose worker errored into `failed`.
///
/// Returns whether the store took the update.
pub(crate) fn mark_failed(store: &JobStore, job_id: &JobId, message: &str) -> bool {
    let update = JobUpdate::new()
        .status(JobStatus::Failed)
        .message(message)
        .clear_current_file()
        .current_progress(0);

    match store.update(job_id, update) {
        Ok(true) => true,
        Ok(false) => {
            warn!(job_id = %job_id, "Job disappeared before it could be marked as failed");
            false
        }
        Err(e) => {
            warn!(job_id = %job_id, "Failed to mark job as failed: {}", e);
            false
        }
    }
}
