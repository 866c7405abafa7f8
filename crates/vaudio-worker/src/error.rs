//! Worker error types.

use thiserror::Error;
use vaudio_models::{InvalidTransition, JobId};

pub type StoreResult<T> = Result<T, StoreError>;

/// Job store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job already exists: {0}")]
    DuplicateKey(JobId),

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Rejected before a job exists.
    #[error("{message}")]
    InvalidUpload {
        message: String,
        unsupported_files: Vec<String>,
    },

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Media error: {0}")]
    Media(#[from] vaudio_media::MediaError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_upload(message: impl Into<String>) -> Self {
        Self::InvalidUpload {
            message: message.into(),
            unsupported_files: Vec::new(),
        }
    }

    pub fn task(msg: impl Into<String>) -> Self {
        Self::Task(msg.into())
    }

    /// Check if the error means the requested job does not exist (or is not
    /// in a state that exposes it).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkerError::NotFound(_) | WorkerError::Store(StoreError::NotFound(_))
        )
    }
}
