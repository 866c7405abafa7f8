//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub converter: CheckStatus,
    pub work_dir: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks that the converter can run and the work directory is usable.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let converter_check = {
        let start = Instant::now();
        let converter = state.service.converter();
        match converter.check_available() {
            Ok(()) => CheckStatus::ok(start.elapsed().as_millis() as u64),
            Err(e) => CheckStatus::error(format!("{}: {}", converter.name(), e)),
        }
    };

    let work_dir_check = {
        let start = Instant::now();
        let work_dir = &state.service.config().work_dir;
        match tokio::fs::create_dir_all(work_dir).await {
            Ok(()) if work_dir.is_dir() => CheckStatus::ok(start.elapsed().as_millis() as u64),
            Ok(()) => CheckStatus::error(format!("{} is not a directory", work_dir.display())),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let healthy = converter_check.is_ok() && work_dir_check.is_ok();
    let response = ReadinessResponse {
        status: if healthy { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            converter: converter_check,
            work_dir: work_dir_check,
        },
    };

    if healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
