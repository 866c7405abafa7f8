//! API integration tests.
//!
//! The router runs against a fake converter that writes a small file for
//! each video, except for files named `silent.*` (no audio track) and
//! `slow.*` (takes a while before succeeding).

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use vaudio_api::{create_router, ApiConfig, AppState};
use vaudio_media::{MediaConverter, MediaError, MediaResult, ProgressCallback, ProgressEvent};
use vaudio_models::AudioFormat;
use vaudio_worker::WorkerConfig;
use zip::ZipArchive;

const BOUNDARY: &str = "vaudio-test-boundary";

struct FakeConverter {
    available: bool,
}

#[async_trait]
impl MediaConverter for FakeConverter {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn output_format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn check_available(&self) -> MediaResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(MediaError::FfmpegNotFound)
        }
    }

    async fn extract_audio(
        &self,
        source: &Path,
        destination: &Path,
        on_progress: ProgressCallback,
    ) -> MediaResult<PathBuf> {
        self.check_available()?;

        let stem = source.file_stem().unwrap().to_string_lossy().into_owned();
        if stem == "silent" {
            return Err(MediaError::no_audio_track(source));
        }
        if stem == "slow" {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        on_progress(ProgressEvent::Fraction(0.5));
        tokio::fs::create_dir_all(destination.parent().unwrap()).await?;
        tokio::fs::write(destination, b"ID3 fake audio").await?;
        on_progress(ProgressEvent::Fraction(1.0));
        Ok(destination.to_path_buf())
    }
}

struct TestApp {
    router: Router,
    work_dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(ApiConfig::default(), true)
    }

    fn with_config(config: ApiConfig, available: bool) -> Self {
        let work_dir = tempfile::tempdir().unwrap();
        let worker_config = WorkerConfig::default().with_work_dir(work_dir.path());
        let state = AppState::with_converter(
            config,
            worker_config,
            Arc::new(FakeConverter { available }),
        );

        Self {
            router: create_router(state, None),
            work_dir,
        }
    }

    async fn get(&self, uri: &str) -> Response {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn upload(&self, parts: &[(&str, &str, &[u8])]) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/convert")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", BOUNDARY),
                    )
                    .body(Body::from(multipart_body(parts)))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Poll `/status` until the job leaves pending/running.
    async fn wait_for_job(&self, job_id: &str) -> Value {
        for _ in 0..200 {
            let response = self.get(&format!("/status/{}", job_id)).await;
            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            if body["status"] == "completed" || body["status"] == "failed" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {} did not finish", job_id);
    }

    fn scratch_dirs(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.work_dir.path())
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }
}

fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn json_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reports_converter() {
    let app = TestApp::new();
    let response = app.get("/ready").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["checks"]["converter"]["status"], "ok");
    assert_eq!(body["checks"]["work_dir"]["status"], "ok");

    let app = TestApp::with_config(ApiConfig::default(), false);
    let response = app.get("/ready").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["converter"]["status"], "error");
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = TestApp::new();
    let response = app.get("/health").await;

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_convert_without_videos_is_rejected() {
    let app = TestApp::new();

    let response = app.upload(&[("notes", "clip.mp4", b"data")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Please choose at least one video file or folder."
    );

    // Empty file name counts as no selection
    let response = app.upload(&[("videos", "", b"")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(app.scratch_dirs().is_empty());
}

#[tokio::test]
async fn test_convert_only_unsupported_files() {
    let app = TestApp::new();

    let response = app
        .upload(&[
            ("videos", "docs/readme.txt", b"hello"),
            ("videos", "cover.PNG", b"png"),
        ])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"], "No supported video files were uploaded.");
    assert_eq!(
        body["details"]["unsupported_files"],
        serde_json::json!(["cover.PNG", "docs/readme.txt"])
    );

    assert!(app.scratch_dirs().is_empty());
}

#[tokio::test]
async fn test_convert_poll_and_download_once() {
    let app = TestApp::new();

    let response = app
        .upload(&[
            ("videos", "trip/day1/clip.mp4", b"video-1"),
            ("videos", "trip/silent.MKV", b"video-2"),
            ("videos", "trip/notes.txt", b"text"),
        ])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let job_id = json_body(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let job = app.wait_for_job(&job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["message"], "Conversion completed with some errors.");
    assert_eq!(job["total_files"], 2);
    assert_eq!(job["processed_files"], 2);
    assert_eq!(job["converted"], 1);
    assert_eq!(job["errors"].as_array().unwrap().len(), 1);
    assert!(job["errors"][0].as_str().unwrap().starts_with("trip/silent.MKV: "));
    assert_eq!(job["generated_files"], serde_json::json!(["trip/day1/clip.mp3"]));
    assert_eq!(job["unsupported_files"], serde_json::json!(["trip/notes.txt"]));
    assert_eq!(job["download_url"], format!("/download/{}", job_id));

    let response = app.get(&format!("/download/{}", job_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"converted_audio.zip\""
    );

    let bytes = body_bytes(response).await;
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    assert_eq!(names, vec!["conversion_report.txt", "trip/day1/clip.mp3"]);

    let mut report = String::new();
    archive
        .by_name("conversion_report.txt")
        .unwrap()
        .read_to_string(&mut report)
        .unwrap();
    assert!(report.starts_with("Some files could not be converted:\n"));

    // Single-shot: the job is gone
    let response = app.get(&format!("/download/{}", job_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app.get(&format!("/status/{}", job_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Scratch directory removal runs after the body is dropped
    for _ in 0..100 {
        if app.scratch_dirs().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(app.scratch_dirs().is_empty());
}

#[tokio::test]
async fn test_upload_paths_are_sanitized() {
    let app = TestApp::new();

    let response = app
        .upload(&[("videos", "../../outside/./clip.mov", b"video")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let job_id = json_body(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let job = app.wait_for_job(&job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["generated_files"], serde_json::json!(["outside/clip.mp3"]));

    // Nothing escaped the job's scratch directory
    let dirs = app.scratch_dirs();
    assert_eq!(dirs.len(), 1);
    assert!(dirs[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("convert_job_"));
}

#[tokio::test]
async fn test_failed_job_is_not_downloadable() {
    let app = TestApp::new();

    let response = app.upload(&[("videos", "silent.mp4", b"video")]).await;
    let job_id = json_body(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let job = app.wait_for_job(&job_id).await;
    assert_eq!(job["status"], "failed");
    assert_eq!(job["message"], "Conversion failed for all uploaded videos.");
    assert!(job.get("download_url").is_none());

    let response = app.get(&format!("/download/{}", job_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Status stays available after a refused download
    let response = app.get(&format!("/status/{}", job_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_download_refused_while_running() {
    let app = TestApp::new();

    let response = app.upload(&[("videos", "slow.avi", b"video")]).await;
    let job_id = json_body(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.get(&format!("/download/{}", job_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let job = app.wait_for_job(&job_id).await;
    assert_eq!(job["status"], "completed");

    let response = app.get(&format!("/download/{}", job_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_job_returns_not_found() {
    let app = TestApp::new();

    let response = app.get("/status/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Job not found");

    let response = app.get("/download/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limiting() {
    let config = ApiConfig {
        rate_limit_rps: 1,
        ..ApiConfig::default()
    };
    let app = TestApp::with_config(config, true);

    let request = || {
        Request::builder()
            .uri("/status/unknown")
            .header("X-Forwarded-For", "192.168.1.100")
            .body(Body::empty())
            .unwrap()
    };

    let first = app.router.clone().oneshot(request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::NOT_FOUND);

    let second = app.router.clone().oneshot(request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.headers()[header::RETRY_AFTER], "1");

    // Health probes are not rate limited
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}
