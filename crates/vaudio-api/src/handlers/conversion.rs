//! Upload, status and download handlers.

use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use futures_util::StreamExt;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use vaudio_models::encoding::ARCHIVE_FILE_NAME;
use vaudio_models::{sanitize_relative_path, Job, JobId, JobStatus};
use vaudio_worker::JobWorkspace;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field carrying the uploaded videos.
const UPLOAD_FIELD: &str = "videos";

const NO_SELECTION: &str = "Please choose at least one video file or folder.";

#[derive(Serialize)]
pub struct ConvertResponse {
    pub job_id: JobId,
}

/// Accept a batch of videos and start converting them.
///
/// Every part named `videos` with a non-empty file name is streamed to the
/// job's scratch directory under its sanitized relative path.
pub async fn convert(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ConvertResponse>> {
    let workspace = state.service.open_workspace().await?;

    let uploads = match save_uploads(&workspace, &mut multipart).await {
        Ok(uploads) => uploads,
        Err(e) => {
            workspace.remove().await;
            return Err(e);
        }
    };

    if uploads.is_empty() {
        workspace.remove().await;
        return Err(ApiError::bad_request(NO_SELECTION));
    }

    let job_id = state.service.submit(workspace, uploads).await?;
    Ok(Json(ConvertResponse { job_id }))
}

async fn save_uploads(workspace: &JobWorkspace, multipart: &mut Multipart) -> ApiResult<Vec<PathBuf>> {
    let mut uploads = Vec::new();
    let mut total_bytes: u64 = 0;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let relative = match field.file_name() {
            Some(name) if !name.is_empty() => sanitize_relative_path(name),
            _ => continue,
        };

        let mut file = workspace.create_upload(&relative).await?;
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            total_bytes += chunk.len() as u64;
        }
        file.flush().await?;

        uploads.push(relative);
    }

    metrics::record_upload_bytes(total_bytes);
    info!(
        job_id = %workspace.job_id(),
        files = uploads.len(),
        bytes = total_bytes,
        "Saved uploads"
    );

    Ok(uploads)
}

/// Job projection returned to pollers.
#[derive(Serialize)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: Option<String>,
    pub total_files: u32,
    pub processed_files: u32,
    pub converted: u32,
    pub errors: Vec<String>,
    pub generated_files: Vec<String>,
    pub unsupported_files: Vec<String>,
    pub current_file: Option<String>,
    pub current_progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        let download_url = job
            .is_downloadable()
            .then(|| format!("/download/{}", job.id));

        Self {
            job_id: job.id,
            status: job.status,
            message: job.message,
            total_files: job.total_files,
            processed_files: job.processed_files,
            converted: job.converted,
            errors: job.errors,
            generated_files: job.generated_files,
            unsupported_files: job.unsupported_files,
            current_file: job.current_file,
            current_progress: job.current_progress,
            download_url,
        }
    }
}

/// Get the current state of a job.
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = state.service.status(&JobId::from_string(job_id))?;
    Ok(Json(job.into()))
}

/// Stream a completed job's archive, then forget the job.
///
/// The job leaves the store before the first byte is sent, so a second
/// request gets 404. Scratch files are removed once the body is dropped.
pub async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let download = state.service.take_download(&JobId::from_string(job_id))?;

    let file = match tokio::fs::File::open(&download.archive_path).await {
        Ok(file) => file,
        Err(e) => {
            state.service.discard(&download).await;
            return Err(ApiError::internal(format!("Archive unavailable: {}", e)));
        }
    };
    let content_length = file.metadata().await.map(|m| m.len()).ok();

    info!(job_id = %download.job_id, "Serving conversion archive");
    metrics::record_download();

    let service = state.service.clone();
    let cleanup = scopeguard::guard(download, move |download| {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    service.discard(&download).await;
                });
            }
            Err(_) => warn!(job_id = %download.job_id, "No runtime to clean up download"),
        }
    });

    let stream = ReaderStream::new(file).map(move |chunk| {
        let _cleanup = &cleanup;
        chunk
    });

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", ARCHIVE_FILE_NAME),
        );
    if let Some(len) = content_length {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    builder
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
