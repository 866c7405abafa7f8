//! Conversion job records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::job_status::{InvalidTransition, JobStatus};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One batch video-to-audio conversion request and its tracked state.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Current status
    #[serde(default)]
    pub status: JobStatus,

    /// Human-readable status line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Number of supported files queued for conversion
    pub total_files: u32,

    /// Files attempted so far (success or failure)
    #[serde(default)]
    pub processed_files: u32,

    /// Files converted successfully
    #[serde(default)]
    pub converted: u32,

    /// Per-file failure lines, in processing order
    #[serde(default)]
    pub errors: Vec<String>,

    /// Archive-relative names of produced audio files
    #[serde(default)]
    pub generated_files: Vec<String>,

    /// Uploaded files skipped because of their extension (sorted)
    #[serde(default)]
    pub unsupported_files: Vec<String>,

    /// Relative path of the file being converted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,

    /// Progress of the current file (0-100)
    #[serde(default)]
    pub current_progress: u8,

    /// Packaged archive, set once the job completes
    #[serde(skip)]
    pub download_path: Option<PathBuf>,

    /// Scratch directory holding uploads and outputs
    #[serde(skip)]
    pub temp_dir: Option<PathBuf>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a pending job for `total_files` supported uploads.
    pub fn new(id: JobId, total_files: u32) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            message: None,
            total_files,
            processed_files: 0,
            converted: 0,
            errors: Vec::new(),
            generated_files: Vec::new(),
            unsupported_files: Vec::new(),
            current_file: None,
            current_progress: 0,
            download_path: None,
            temp_dir: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the scratch directory.
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }

    /// Set the unsupported uploads (stored sorted).
    pub fn with_unsupported_files(mut self, mut files: Vec<String>) -> Self {
        files.sort();
        self.unsupported_files = files;
        self
    }

    /// Set the initial status message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the archive can be handed out.
    pub fn is_downloadable(&self) -> bool {
        self.status == JobStatus::Completed && self.download_path.is_some()
    }

    /// Merge a partial update into the record.
    ///
    /// Either every field of `update` is applied or, when the status change
    /// is not allowed, none is.
    pub fn apply(&mut self, update: JobUpdate) -> Result<(), InvalidTransition> {
        if let Some(status) = update.status {
            self.status = self.status.transition(status)?;
        }
        if let Some(message) = update.message {
            self.message = Some(message);
        }
        if let Some(processed) = update.processed_files {
            self.processed_files = processed;
        }
        if let Some(converted) = update.converted {
            self.converted = converted;
        }
        if let Some(errors) = update.errors {
            self.errors = errors;
        }
        if let Some(generated) = update.generated_files {
            self.generated_files = generated;
        }
        if let Some(current_file) = update.current_file {
            self.current_file = current_file;
        }
        if let Some(progress) = update.current_progress {
            self.current_progress = progress.min(100);
        }
        if let Some(path) = update.download_path {
            self.download_path = Some(path);
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A set of field assignments merged into a [`Job`] in one step.
///
/// Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub message: Option<String>,
    pub processed_files: Option<u32>,
    pub converted: Option<u32>,
    pub errors: Option<Vec<String>>,
    pub generated_files: Option<Vec<String>>,
    /// `Some(None)` clears the current file.
    pub current_file: Option<Option<String>>,
    pub current_progress: Option<u8>,
    pub download_path: Option<PathBuf>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn processed_files(mut self, processed: u32) -> Self {
        self.processed_files = Some(processed);
        self
    }

    pub fn converted(mut self, converted: u32) -> Self {
        self.converted = Some(converted);
        self
    }

    pub fn errors(mut self, errors: Vec<String>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn generated_files(mut self, files: Vec<String>) -> Self {
        self.generated_files = Some(files);
        self
    }

    pub fn current_file(mut self, file: impl Into<String>) -> Self {
        self.current_file = Some(Some(file.into()));
        self
    }

    pub fn clear_current_file(mut self) -> Self {
        self.current_file = Some(None);
        self
    }

    pub fn current_progress(mut self, progress: u8) -> Self {
        self.current_progress = Some(progress);
        self
    }

    pub fn download_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.download_path = Some(path.into());
        self
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new(JobId::new(), 3);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.total_files, 3);
        assert_eq!(job.current_progress, 0);
        assert!(!job.is_terminal());
        assert!(!job.is_downloadable());
    }

    #[test]
    fn test_unsupported_files_are_sorted() {
        let job = Job::new(JobId::new(), 1)
            .with_unsupported_files(vec!["b.txt".into(), "a/notes.pdf".into()]);
        assert_eq!(job.unsupported_files, vec!["a/notes.pdf", "b.txt"]);
    }

    #[test]
    fn test_apply_merges_only_set_fields() {
        let mut job = Job::new(JobId::new(), 2).with_message("Preparing conversion...");
        job.apply(JobUpdate::new().status(JobStatus::Running).current_file("a.mp4"))
            .unwrap();

        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.current_file.as_deref(), Some("a.mp4"));
        assert_eq!(job.message.as_deref(), Some("Preparing conversion..."));

        job.apply(JobUpdate::new().clear_current_file().current_progress(250))
            .unwrap();
        assert!(job.current_file.is_none());
        assert_eq!(job.current_progress, 100);
    }

    #[test]
    fn test_rejected_transition_applies_nothing() {
        let mut job = Job::new(JobId::new(), 1);
        job.apply(JobUpdate::new().status(JobStatus::Running)).unwrap();
        job.apply(JobUpdate::new().status(JobStatus::Failed)).unwrap();

        let before = job.updated_at;
        let err = job
            .apply(JobUpdate::new().status(JobStatus::Running).converted(1))
            .unwrap_err();
        assert_eq!(err.from, JobStatus::Failed);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.converted, 0);
        assert_eq!(job.updated_at, before);
    }

    #[test]
    fn test_downloadable_requires_archive() {
        let mut job = Job::new(JobId::new(), 1);
        job.apply(JobUpdate::new().status(JobStatus::Running)).unwrap();
        job.apply(JobUpdate::new().status(JobStatus::Completed)).unwrap();
        assert!(!job.is_downloadable());

        job.apply(JobUpdate::new().download_path("/tmp/x/converted_audio.zip"))
            .unwrap();
        assert!(job.is_downloadable());
    }

    #[test]
    fn test_empty_update() {
        assert!(JobUpdate::new().is_empty());
        assert!(!JobUpdate::new().converted(0).is_empty());
    }

    #[test]
    fn test_serialization_skips_paths() {
        let job = Job::new(JobId::from_string("job-1"), 1).with_temp_dir("/tmp/secret");
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["id"], "job-1");
        assert_eq!(value["status"], "pending");
        assert!(value.get("temp_dir").is_none());
        assert!(value.get("download_path").is_none());
    }
}
