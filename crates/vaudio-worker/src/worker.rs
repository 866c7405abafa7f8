//! The per-job conversion loop.
//!
//! A [`ConversionWorker`] is the only writer of its job after creation. It
//! walks the queued files in order, converts each one through the
//! [`MediaConverter`], publishes every step to the [`JobStore`] and finally
//! packages the outputs into a ZIP archive.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::warn;
use vaudio_media::{MediaConverter, MediaError, ProgressCallback, ProgressNormalizer};
use vaudio_models::encoding::ARCHIVE_FILE_NAME;
use vaudio_models::{audio_relative_path, to_posix, JobId, JobStatus, JobUpdate};

use crate::archive::{self, ArchiveEntry};
use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::metrics;
use crate::store::JobStore;

pub const MSG_PREPARING: &str = "Preparing conversion...";
pub const MSG_CONVERTING: &str = "Converting videos...";
pub const MSG_COMPLETED: &str = "Conversion completed!";
pub const MSG_COMPLETED_WITH_ERRORS: &str = "Conversion completed with some errors.";
pub const MSG_ALL_FAILED: &str = "Conversion failed for all uploaded videos.";
pub const MSG_NOTHING_GENERATED: &str = "No audio files were generated.";

/// A supported upload waiting for conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFile {
    /// Absolute path of the saved upload
    pub source: PathBuf,
    /// Sanitized path relative to the upload root
    pub relative: PathBuf,
}

impl QueuedFile {
    pub fn new(source: impl Into<PathBuf>, relative: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            relative: relative.into(),
        }
    }
}

/// Converts the files of one job.
#[derive(Clone)]
pub struct ConversionWorker {
    store: JobStore,
    converter: Arc<dyn MediaConverter>,
}

impl ConversionWorker {
    pub fn new(store: JobStore, converter: Arc<dyn MediaConverter>) -> Self {
        Self { store, converter }
    }

    /// Run the job to a terminal state and return that state.
    ///
    /// Per-file failures are recorded on the job and never returned. An
    /// `Err` means the store rejected an update.
    pub async fn run(
        &self,
        job_id: &JobId,
        files: Vec<QueuedFile>,
        output_dir: &Path,
    ) -> WorkerResult<JobStatus> {
        let total = files.len();
        let logger = JobLogger::new(job_id, total);
        let format = self.converter.output_format();

        logger.started(self.converter.name(), format);

        self.store.update(
            job_id,
            JobUpdate::new()
                .status(JobStatus::Running)
                .message(MSG_CONVERTING)
                .errors(Vec::new())
                .current_progress(0),
        )?;

        let mut errors: Vec<String> = Vec::new();
        let mut entries: Vec<ArchiveEntry> = Vec::new();
        let mut converted: u32 = 0;
        let mut archive_names: HashSet<String> = HashSet::new();

        for (index, file) in files.iter().enumerate() {
            let position = index as u32 + 1;
            let display = to_posix(&file.relative);

            self.store.update(
                job_id,
                JobUpdate::new()
                    .current_file(display.clone())
                    .processed_files(position - 1)
                    .current_progress(0),
            )?;
            logger.file_started(index + 1, &display);

            let archive_relative = reserve_archive_path(
                &audio_relative_path(&file.relative, format),
                &mut archive_names,
            );
            let archive_name = to_posix(&archive_relative);
            let destination = output_dir.join(&archive_relative);
            let started = Instant::now();

            let result = self
                .converter
                .extract_audio(&file.source, &destination, self.progress_callback(job_id))
                .await;

            let file_progress = match result {
                Ok(output) => {
                    converted += 1;
                    logger.file_converted(&display, &archive_name, started.elapsed());
                    metrics::record_file_converted(
                        format.extension(),
                        started.elapsed().as_secs_f64(),
                    );
                    entries.push(ArchiveEntry {
                        source: output,
                        name: archive_name,
                    });
                    100
                }
                Err(e) if e.is_capability_unavailable() => {
                    return self.abort_unavailable(job_id, &logger, e, position, errors);
                }
                Err(e) => {
                    archive_names.remove(&archive_name.to_lowercase());
                    logger.file_failed(&display, &e);
                    metrics::record_file_failed(failure_kind(&e));
                    errors.push(format!("{}: {}", display, e.detail()));
                    0
                }
            };

            self.store.update(
                job_id,
                JobUpdate::new()
                    .processed_files(position)
                    .converted(converted)
                    .errors(errors.clone())
                    .current_progress(file_progress),
            )?;
        }

        if entries.is_empty() {
            let message = if errors.is_empty() {
                MSG_NOTHING_GENERATED
            } else {
                MSG_ALL_FAILED
            };
            logger.aborted(message);
            metrics::record_job_failed("all_files_failed");
            self.store.update(
                job_id,
                JobUpdate::new()
                    .status(JobStatus::Failed)
                    .message(message)
                    .clear_current_file()
                    .current_progress(0),
            )?;
            return Ok(JobStatus::Failed);
        }

        let archive_path = output_dir.join(ARCHIVE_FILE_NAME);
        let generated: Vec<String> = entries.iter().map(|entry| entry.name.clone()).collect();

        if let Err(e) = archive::package(archive_path.clone(), entries, errors.clone()).await {
            let message = format!("Failed to create archive: {}", e);
            logger.aborted(&message);
            metrics::record_job_failed("archive");
            self.store.update(
                job_id,
                JobUpdate::new()
                    .status(JobStatus::Failed)
                    .message(message)
                    .clear_current_file()
                    .current_progress(0),
            )?;
            return Ok(JobStatus::Failed);
        }

        let message = if errors.is_empty() {
            MSG_COMPLETED
        } else {
            MSG_COMPLETED_WITH_ERRORS
        };
        self.store.update(
            job_id,
            JobUpdate::new()
                .status(JobStatus::Completed)
                .message(message)
                .download_path(archive_path)
                .generated_files(generated)
                .clear_current_file()
                .current_progress(100),
        )?;

        metrics::record_job_completed(!errors.is_empty());
        logger.finished(JobStatus::Completed, converted, errors.len());

        Ok(JobStatus::Completed)
    }

    /// The converter cannot run at all; stop at the current file.
    fn abort_unavailable(
        &self,
        job_id: &JobId,
        logger: &JobLogger,
        error: MediaError,
        position: u32,
        mut errors: Vec<String>,
    ) -> WorkerResult<JobStatus> {
        let message = error.to_string();
        logger.aborted(&message);
        metrics::record_job_failed("capability_unavailable");

        errors.push(message.clone());
        self.store.update(
            job_id,
            JobUpdate::new()
                .status(JobStatus::Failed)
                .message(message)
                .processed_files(position)
                .errors(errors)
                .clear_current_file()
                .current_progress(0),
        )?;

        Ok(JobStatus::Failed)
    }

    /// Progress sink for one file: fresh normalizer, publishes only advances.
    fn progress_callback(&self, job_id: &JobId) -> ProgressCallback {
        let store = self.store.clone();
        let job_id = job_id.clone();
        let normalizer = ProgressNormalizer::new();

        Arc::new(move |event| {
            if let Some(percent) = normalizer.normalize(&event) {
                if let Err(e) = store.update(&job_id, JobUpdate::new().current_progress(percent)) {
                    warn!(job_id = %job_id, "Failed to publish progress: {}", e);
                }
            }
        })
    }
}

/// Claim an archive name for `relative`, adding ` (n)` before the extension
/// when it is taken. Names compare case-insensitively so outputs never
/// collide on disk either.
fn reserve_archive_path(relative: &Path, used: &mut HashSet<String>) -> PathBuf {
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = relative
        .extension()
        .map(|e| e.to_string_lossy().into_owned());

    let mut candidate = relative.to_path_buf();
    let mut suffix = 1;
    while !used.insert(to_posix(&candidate).to_lowercase()) {
        let name = match &extension {
            Some(ext) => format!("{} ({}).{}", stem, suffix, ext),
            None => format!("{} ({})", stem, suffix),
        };
        candidate = relative.with_file_name(name);
        suffix += 1;
    }
    candidate
}

fn failure_kind(error: &MediaError) -> &'static str {
    match error {
        MediaError::NoAudioTrack { .. } => "no_audio_track",
        MediaError::Timeout(_) => "timeout",
        MediaError::FileNotFound(_) => "file_not_found",
        _ => "conversion_failed",
    }
}
