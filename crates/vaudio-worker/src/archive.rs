//! ZIP packaging of converted files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use vaudio_models::encoding::REPORT_FILE_NAME;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{WorkerError, WorkerResult};

/// One converted file and its name inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub source: PathBuf,
    /// POSIX relative path
    pub name: String,
}

/// Body of the error report stored next to the audio files.
pub fn report_text(errors: &[String]) -> String {
    format!("Some files could not be converted:\n{}", errors.join("\n"))
}

/// Write the archive synchronously.
///
/// The report entry is added only when `errors` is non-empty.
pub fn write_archive(path: &Path, entries: &[ArchiveEntry], errors: &[String]) -> WorkerResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        zip.start_file(entry.name.as_str(), options)?;
        let mut source = File::open(&entry.source)?;
        std::io::copy(&mut source, &mut zip)?;
    }

    if !errors.is_empty() {
        zip.start_file(REPORT_FILE_NAME, options)?;
        zip.write_all(report_text(errors).as_bytes())?;
    }

    zip.finish()?.flush()?;
    Ok(())
}

/// Write the archive on the blocking pool.
pub async fn package(path: PathBuf, entries: Vec<ArchiveEntry>, errors: Vec<String>) -> WorkerResult<()> {
    tokio::task::spawn_blocking(move || write_archive(&path, &entries, &errors))
        .await
        .map_err(|e| WorkerError::task(format!("archive writer panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_names(path: &Path) -> Vec<String> {
        let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        names
    }

    #[test]
    fn test_archive_with_report() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("a.mp3");
        std::fs::write(&audio, b"ID3 fake audio").unwrap();

        let zip_path = dir.path().join("outputs/converted_audio.zip");
        let entries = vec![ArchiveEntry {
            source: audio,
            name: "trip/a.mp3".to_string(),
        }];
        let errors = vec!["trip/b.mp4: Video 'b.mp4' has no audio track".to_string()];

        write_archive(&zip_path, &entries, &errors).unwrap();

        assert_eq!(read_names(&zip_path), vec!["conversion_report.txt", "trip/a.mp3"]);

        let mut archive = ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let mut report = String::new();
        archive
            .by_name("conversion_report.txt")
            .unwrap()
            .read_to_string(&mut report)
            .unwrap();
        assert_eq!(
            report,
            "Some files could not be converted:\ntrip/b.mp4: Video 'b.mp4' has no audio track"
        );

        let mut audio = Vec::new();
        archive.by_name("trip/a.mp3").unwrap().read_to_end(&mut audio).unwrap();
        assert_eq!(audio, b"ID3 fake audio");
    }

    #[test]
    fn test_archive_without_errors_has_no_report() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("a.mp3");
        std::fs::write(&audio, b"x").unwrap();

        let zip_path = dir.path().join("converted_audio.zip");
        write_archive(
            &zip_path,
            &[ArchiveEntry {
                source: audio,
                name: "a.mp3".to_string(),
            }],
            &[],
        )
        .unwrap();

        assert_eq!(read_names(&zip_path), vec!["a.mp3"]);
    }

    #[test]
    fn test_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_archive(
            &dir.path().join("out.zip"),
            &[ArchiveEntry {
                source: dir.path().join("gone.mp3"),
                name: "gone.mp3".to_string(),
            }],
            &[],
        );
        assert!(matches!(result, Err(WorkerError::Io(_))));
    }
}
