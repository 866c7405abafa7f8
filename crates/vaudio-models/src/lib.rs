//! Shared data models for the vaudio backend.
//!
//! This crate provides Serde-serializable types for:
//! - Conversion jobs and their partial updates
//! - The job status state machine
//! - Target audio formats
//! - Upload path handling and video file classification

pub mod encoding;
pub mod job;
pub mod job_status;
pub mod utils;

// Re-export common types
pub use encoding::AudioFormat;
pub use job::{Job, JobId, JobUpdate};
pub use job_status::{InvalidTransition, JobStatus};
pub use utils::{audio_relative_path, is_supported_video, sanitize_relative_path, to_posix, VIDEO_EXTENSIONS};
