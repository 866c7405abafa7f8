//! Axum HTTP API server.
//!
//! This crate provides:
//! - Multipart upload of videos (single files or whole folders)
//! - Polling of conversion job status
//! - Single-shot download of the converted audio archive
//! - Rate limiting, request ids and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::spawn_job_reaper;
pub use state::AppState;
