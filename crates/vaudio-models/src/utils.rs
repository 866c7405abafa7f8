//! Upload path helpers and video file classification.

use std::path::{Component, Path, PathBuf};

use crate::encoding::AudioFormat;

/// Recognized video extensions (lowercase, with leading dot).
pub const VIDEO_EXTENSIONS: [&str; 7] = [".mp4", ".mkv", ".avi", ".mov", ".flv", ".wmv", ".m4v"];

/// Fallback name when an upload's file name has no usable component.
const FALLBACK_UPLOAD_NAME: &str = "uploaded_file";

/// Check whether a path has a recognized video extension (case-insensitive).
pub fn is_supported_video(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let dotted = format!(".{}", ext.to_ascii_lowercase());
            VIDEO_EXTENSIONS.contains(&dotted.as_str())
        })
        .unwrap_or(false)
}

/// Turn a client-supplied file name into a safe relative path.
///
/// Folder uploads send names such as `holiday/day1/clip.mp4`. Root, prefix,
/// `.` and `..` components are dropped, and both `/` and `\` separate
/// components, so the result never escapes the directory it is joined to.
pub fn sanitize_relative_path(filename: &str) -> PathBuf {
    let parts: Vec<&str> = filename
        .split(['/', '\\'])
        .filter(|part| {
            let mut components = Path::new(part).components();
            matches!(
                (components.next(), components.next()),
                (Some(Component::Normal(_)), None)
            )
        })
        .collect();

    if parts.is_empty() {
        return PathBuf::from(FALLBACK_UPLOAD_NAME);
    }
    parts.iter().collect()
}

/// Render a relative path with `/` separators.
pub fn to_posix(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Archive-relative path of the audio produced from `relative`.
pub fn audio_relative_path(relative: impl AsRef<Path>, format: AudioFormat) -> PathBuf {
    relative.as_ref().with_extension(format.extension())
}
