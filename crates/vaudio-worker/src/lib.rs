//! Audio conversion jobs.
//!
//! This crate provides:
//! - The in-memory job store and its update semantics
//! - The per-job conversion worker and ZIP packaging
//! - Submission, polling and single-shot download of jobs
//! - Supervision of worker tasks and reaping of stale jobs
//! - Local folder conversion for the batch binary

pub mod archive;
pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod reaper;
pub mod service;
pub mod store;
pub mod tasks;
pub mod worker;
pub mod workspace;

pub use config::WorkerConfig;
pub use error::{StoreError, StoreResult, WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use reaper::JobReaper;
pub use service::{ConversionService, Download};
pub use store::JobStore;
pub use tasks::JobTasks;
pub use worker::{ConversionWorker, QueuedFile};
pub use workspace::JobWorkspace;

/// Initialize tracing with colored output for dev, JSON when `LOG_FORMAT=json`.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vaudio=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
