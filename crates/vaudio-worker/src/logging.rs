//! Structured logging for conversion jobs.

use std::fmt::Display;
use std::time::Duration;

use tracing::{error, info, warn, Span};
use vaudio_models::{AudioFormat, JobId, JobStatus};

/// Logs the life of one conversion job.
///
/// Every event carries `job_id`; per-file events also carry `current_file`
/// and the file's position in the queue.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    total_files: usize,
}

impl JobLogger {
    pub fn new(job_id: &JobId, total_files: usize) -> Self {
        Self {
            job_id: job_id.to_string(),
            total_files,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// Span wrapping the worker task.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "conversion_job",
            job_id = %self.job_id,
            total_files = self.total_files
        )
    }

    pub fn started(&self, converter: &str, format: AudioFormat) {
        info!(
            job_id = %self.job_id,
            total_files = self.total_files,
            converter,
            format = %format,
            "Conversion started"
        );
    }

    pub fn file_started(&self, position: usize, current_file: &str) {
        info!(
            job_id = %self.job_id,
            current_file,
            position = %self.position(position),
            "Converting file"
        );
    }

    pub fn file_converted(&self, current_file: &str, archive_name: &str, elapsed: Duration) {
        info!(
            job_id = %self.job_id,
            current_file,
            archive_name,
            elapsed_ms = elapsed.as_millis() as u64,
            "File converted"
        );
    }

    pub fn file_failed(&self, current_file: &str, error: &dyn Display) {
        warn!(
            job_id = %self.job_id,
            current_file,
            "File failed: {}", error
        );
    }

    /// The job stopped before its queue was exhausted, or produced nothing.
    pub fn aborted(&self, reason: &str) {
        error!(job_id = %self.job_id, "Conversion aborted: {}", reason);
    }

    pub fn finished(&self, status: JobStatus, converted: u32, errors: usize) {
        info!(
            job_id = %self.job_id,
            status = %status,
            converted,
            errors,
            "Conversion finished: {}/{} converted",
            converted,
            self.total_files
        );
    }

    fn position(&self, position: usize) -> String {
        format!("{}/{}", position, self.total_files)
    }
}
