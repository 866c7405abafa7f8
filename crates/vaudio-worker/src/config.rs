//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;
use vaudio_models::encoding::DEFAULT_AUDIO_BITRATE;
use vaudio_models::AudioFormat;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding one scratch directory per job
    pub work_dir: PathBuf,
    /// Target audio format
    pub audio_format: AudioFormat,
    /// Bitrate for lossy formats
    pub audio_bitrate: String,
    /// Per-file FFmpeg timeout (0 disables)
    pub conversion_timeout: Duration,
    /// How long a finished job is kept before the reaper removes it
    pub job_ttl: Duration,
    /// How often the reaper sweeps the store
    pub reaper_interval: Duration,
    /// Whether the reaper runs at all
    pub enable_job_reaper: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("vaudio"),
            audio_format: AudioFormat::Mp3,
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            conversion_timeout: Duration::from_secs(3600), // 1 hour
            job_ttl: Duration::from_secs(3600),
            reaper_interval: Duration::from_secs(60),
            enable_job_reaper: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let audio_format = match std::env::var("AUDIO_FORMAT") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}, falling back to {}", e, defaults.audio_format);
                defaults.audio_format
            }),
            Err(_) => defaults.audio_format,
        };

        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            audio_format,
            audio_bitrate: std::env::var("AUDIO_BITRATE").unwrap_or(defaults.audio_bitrate),
            conversion_timeout: Duration::from_secs(
                std::env::var("CONVERSION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            job_ttl: Duration::from_secs(
                std::env::var("JOB_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            reaper_interval: Duration::from_secs(
                std::env::var("REAPER_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            enable_job_reaper: std::env::var("ENABLE_JOB_REAPER")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
        }
    }

    /// Set the work directory.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }
}
