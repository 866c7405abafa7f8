//! Error types for media operations.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during audio extraction.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH. Install FFmpeg to convert videos.")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH. Install FFmpeg to convert videos.")]
    FfprobeNotFound,

    #[error("Video '{name}' has no audio track")]
    NoAudioTrack { name: String },

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a missing-audio error naming the source file.
    pub fn no_audio_track(source: &Path) -> Self {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.display().to_string());
        Self::NoAudioTrack { name }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The conversion tooling itself cannot run; no file can succeed.
    pub fn is_capability_unavailable(&self) -> bool {
        matches!(self, MediaError::FfmpegNotFound | MediaError::FfprobeNotFound)
    }

    /// Human-readable detail for per-file reports.
    ///
    /// FFmpeg failures carry the captured stderr, which says far more than
    /// the exit status.
    pub fn detail(&self) -> String {
        match self {
            MediaError::FfmpegFailed {
                stderr: Some(stderr),
                ..
            }
            | MediaError::FfprobeFailed {
                stderr: Some(stderr),
                ..
            } if !stderr.trim().is_empty() => format!("{} ({})", self, stderr.trim()),
            _ => self.to_string(),
        }
    }
}
