//! Convert every video in a folder to audio.
//!
//! Usage: `vaudio-batch <video_folder> [output_folder] [format]`

use std::path::PathBuf;

use anyhow::Context;
use vaudio_media::FfmpegAudioExtractor;
use vaudio_models::AudioFormat;
use vaudio_worker::batch::{convert_folder, BatchEvent};
use vaudio_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    vaudio_worker::init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(video_folder) = args.next().map(PathBuf::from) else {
        anyhow::bail!("usage: vaudio-batch <video_folder> [output_folder] [format]");
    };
    let output_folder = args.next().filter(|s| !s.is_empty()).map(PathBuf::from);

    let config = WorkerConfig::from_env();
    let format = match args.next() {
        Some(raw) => raw.parse::<AudioFormat>()?,
        None => config.audio_format,
    };

    let extractor = FfmpegAudioExtractor::new(format)
        .with_bitrate(config.audio_bitrate.clone())
        .with_timeout(config.conversion_timeout.as_secs());

    let report = convert_folder(&extractor, &video_folder, output_folder.as_deref(), |event| {
        match event {
            BatchEvent::Converting { source, output } => println!(
                "Converting: {} -> {}",
                display_name(source),
                display_name(output)
            ),
            BatchEvent::Failed { source, error } => {
                println!("Failed to convert {}: {}", display_name(source), error.detail())
            }
        }
    })
    .await
    .with_context(|| format!("converting {}", video_folder.display()))?;

    if report.generated.is_empty() {
        println!("No compatible video files found.");
    } else {
        println!(
            "Conversion completed! {} file(s) written, {} failed.",
            report.generated.len(),
            report.failed
        );
    }

    Ok(())
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
