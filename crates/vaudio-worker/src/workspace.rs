//! Per-job scratch directories.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tracing::{debug, warn};
use vaudio_models::JobId;

const UPLOADS_DIR: &str = "uploads";
const OUTPUTS_DIR: &str = "outputs";

/// Scratch directory owned by one job.
///
/// Layout: `<work_dir>/convert_job_<id>/{uploads,outputs}`. Nothing removes
/// it implicitly; call [`JobWorkspace::remove`] or [`remove_scratch_dir`].
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    job_id: JobId,
    root: PathBuf,
}

impl JobWorkspace {
    /// Create the directory tree for `job_id` under `work_dir`.
    pub async fn create(work_dir: &Path, job_id: JobId) -> std::io::Result<Self> {
        let root = work_dir.join(format!("convert_job_{}", job_id));
        fs::create_dir_all(root.join(UPLOADS_DIR)).await?;
        fs::create_dir_all(root.join(OUTPUTS_DIR)).await?;
        debug!(job_id = %job_id, path = %root.display(), "Created job workspace");
        Ok(Self { job_id, root })
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join(OUTPUTS_DIR)
    }

    /// Absolute path of an upload given its sanitized relative path.
    pub fn upload_path(&self, relative: &Path) -> PathBuf {
        self.uploads_dir().join(relative)
    }

    /// Create (truncating) the file an upload is streamed into.
    pub async fn create_upload(&self, relative: &Path) -> std::io::Result<File> {
        let path = self.upload_path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        File::create(path).await
    }

    /// Delete the whole scratch tree.
    pub async fn remove(&self) {
        remove_scratch_dir(&self.root).await;
    }
}

/// Remove a scratch directory, logging anything but "already gone".
pub async fn remove_scratch_dir(path: &Path) {
    match fs::remove_dir_all(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed scratch directory"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "Failed to remove scratch directory: {}", e),
    }
}
