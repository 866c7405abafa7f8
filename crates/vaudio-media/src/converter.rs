//! The audio extraction capability.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use vaudio_models::encoding::DEFAULT_AUDIO_BITRATE;
use vaudio_models::AudioFormat;

use crate::command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;
use crate::progress::ProgressEvent;

/// Progress callback type.
///
/// Invoked synchronously from the converter for every progress report; the
/// receiver decides what to publish.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Extracts the audio track of a video into a standalone audio file.
#[async_trait]
pub trait MediaConverter: Send + Sync {
    /// Name of this converter for logging.
    fn name(&self) -> &'static str;

    /// Format of the files this converter writes.
    fn output_format(&self) -> AudioFormat;

    /// Check that the converter can run at all.
    ///
    /// An error here is capability-unavailable: no file can succeed.
    fn check_available(&self) -> MediaResult<()>;

    /// Extract the audio of `source` into `destination`.
    ///
    /// Parent directories of `destination` are created as needed. Returns
    /// the path of the written file.
    async fn extract_audio(
        &self,
        source: &Path,
        destination: &Path,
        on_progress: ProgressCallback,
    ) -> MediaResult<PathBuf>;
}

/// [`MediaConverter`] backed by the ffprobe and ffmpeg CLIs.
#[derive(Debug, Clone)]
pub struct FfmpegAudioExtractor {
    format: AudioFormat,
    bitrate: String,
    timeout_secs: Option<u64>,
}

impl FfmpegAudioExtractor {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            timeout_secs: None,
        }
    }

    /// Set the bitrate used by lossy formats.
    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = bitrate.into();
        self
    }

    /// Kill FFmpeg if a single file takes longer than this.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs).filter(|s| *s > 0);
        self
    }

    /// Build the FFmpeg invocation for one file.
    pub fn build_command(&self, source: &Path, destination: &Path) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(source, destination)
            .map("0:a:0")
            .audio_only()
            .audio_codec(self.format.codec());

        if self.format.uses_bitrate() {
            cmd.audio_bitrate(&self.bitrate)
        } else {
            cmd
        }
    }

    fn runner(&self) -> FfmpegRunner {
        match self.timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        }
    }
}

impl Default for FfmpegAudioExtractor {
    fn default() -> Self {
        Self::new(AudioFormat::default())
    }
}

#[async_trait]
impl MediaConverter for FfmpegAudioExtractor {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn output_format(&self) -> AudioFormat {
        self.format
    }

    fn check_available(&self) -> MediaResult<()> {
        check_ffmpeg()?;
        check_ffprobe()?;
        Ok(())
    }

    async fn extract_audio(
        &self,
        source: &Path,
        destination: &Path,
        on_progress: ProgressCallback,
    ) -> MediaResult<PathBuf> {
        self.check_available()?;

        let info = probe_media(source).await?;
        if !info.has_audio {
            return Err(MediaError::no_audio_track(source));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let cmd = self.build_command(source, destination);
        let total_ms = info.duration_ms();
        debug!(
            source = %source.display(),
            duration_ms = total_ms,
            codec = self.format.codec(),
            "Extracting audio"
        );

        let callback = Arc::clone(&on_progress);
        self.runner()
            .run_with_progress(&cmd, move |progress| {
                if let Some(event) = progress.to_event(total_ms) {
                    callback(event);
                }
            })
            .await?;

        on_progress(ProgressEvent::Fraction(1.0));

        info!(
            source = %source.display(),
            output = %destination.display(),
            "Audio extracted"
        );

        Ok(destination.to_path_buf())
    }
}
