#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for audio extraction.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Normalization of progress events into a monotonic percentage
//! - FFprobe stream inspection
//! - The [`MediaConverter`] capability and its FFmpeg implementation

pub mod command;
pub mod converter;
pub mod error;
pub mod probe;
pub mod progress;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use converter::{FfmpegAudioExtractor, MediaConverter, ProgressCallback};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_media, MediaInfo};
pub use progress::{FfmpegProgress, ProgressEvent, ProgressNormalizer};
