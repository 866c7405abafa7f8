//! Local folder conversion, without the job machinery.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use vaudio_media::{MediaConverter, MediaError, ProgressCallback};
use vaudio_models::is_supported_video;

use crate::error::WorkerResult;

/// Something worth telling the user while a folder is converted.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    Converting { source: &'a Path, output: &'a Path },
    Failed { source: &'a Path, error: &'a MediaError },
}

/// Outcome of a folder conversion.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub generated: Vec<PathBuf>,
    pub failed: usize,
}

/// Supported videos directly inside `folder`, sorted by name.
pub async fn scan_folder(folder: &Path) -> WorkerResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    let mut videos = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && is_supported_video(&path) {
            videos.push(path);
        }
    }

    videos.sort();
    Ok(videos)
}

/// Convert every supported video in `folder`.
///
/// Audio files land in `output_folder`, or next to the videos when it is
/// `None`. Per-file failures are reported through `on_event` and skipped; a
/// converter that cannot run at all fails the whole batch up front.
pub async fn convert_folder<F>(
    converter: &dyn MediaConverter,
    folder: &Path,
    output_folder: Option<&Path>,
    mut on_event: F,
) -> WorkerResult<BatchReport>
where
    F: FnMut(BatchEvent<'_>),
{
    converter.check_available()?;

    let output_folder = output_folder.unwrap_or(folder);
    tokio::fs::create_dir_all(output_folder).await?;

    let extension = converter.output_format().extension();
    let mut report = BatchReport::default();
    let silent: ProgressCallback = Arc::new(|_| {});

    for source in scan_folder(folder).await? {
        let Some(stem) = source.file_stem() else {
            continue;
        };
        let output = output_folder.join(format!("{}.{}", stem.to_string_lossy(), extension));

        on_event(BatchEvent::Converting {
            source: &source,
            output: &output,
        });

        match converter
            .extract_audio(&source, &output, Arc::clone(&silent))
            .await
        {
            Ok(path) => report.generated.push(path),
            Err(error) => {
                on_event(BatchEvent::Failed {
                    source: &source,
                    error: &error,
                });
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
