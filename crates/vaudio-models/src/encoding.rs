//! Audio encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default audio bitrate for lossy formats
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";

/// Name of the packaged archive inside a job's output directory.
pub const ARCHIVE_FILE_NAME: &str = "converted_audio.zip";

/// Name of the error report entry inside the archive.
pub const REPORT_FILE_NAME: &str = "conversion_report.txt";

/// Target audio format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    M4a,
    Wav,
    Flac,
    Ogg,
}

impl AudioFormat {
    /// All supported formats.
    pub const ALL: [AudioFormat; 5] = [
        AudioFormat::Mp3,
        AudioFormat::M4a,
        AudioFormat::Wav,
        AudioFormat::Flac,
        AudioFormat::Ogg,
    ];

    /// File extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
        }
    }

    /// FFmpeg encoder for this format.
    pub fn codec(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::M4a => "aac",
            AudioFormat::Wav => "pcm_s16le",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "libvorbis",
        }
    }

    /// Whether `-b:a` is meaningful (lossy encoders only).
    pub fn uses_bitrate(&self) -> bool {
        matches!(self, AudioFormat::Mp3 | AudioFormat::M4a | AudioFormat::Ogg)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Unknown audio format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported audio format: {0}")]
pub struct UnknownAudioFormat(pub String);

impl FromStr for AudioFormat {
    type Err = UnknownAudioFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('.').to_ascii_lowercase();
        AudioFormat::ALL
            .into_iter()
            .find(|format| format.extension() == normalized)
            .ok_or_else(|| UnknownAudioFormat(s.to_string()))
    }
}
