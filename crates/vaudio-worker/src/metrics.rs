//! Conversion metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder that renders them.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "vaudio_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vaudio_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vaudio_jobs_failed_total";
    pub const JOBS_REAPED_TOTAL: &str = "vaudio_jobs_reaped_total";
    pub const JOBS_ACTIVE: &str = "vaudio_jobs_active";
    pub const JOB_FILES: &str = "vaudio_job_files";

    pub const FILES_CONVERTED_TOTAL: &str = "vaudio_files_converted_total";
    pub const FILES_FAILED_TOTAL: &str = "vaudio_files_failed_total";
    pub const CONVERSION_DURATION_SECONDS: &str = "vaudio_conversion_duration_seconds";
}

pub fn record_job_submitted(total_files: u32) {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
    gauge!(names::JOBS_ACTIVE).increment(1.0);
    histogram!(names::JOB_FILES).record(total_files as f64);
}

/// Record job completed.
pub fn record_job_completed(with_errors: bool) {
    let labels = [("with_errors", with_errors.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
    gauge!(names::JOBS_ACTIVE).decrement(1.0);
}

/// Record job failed.
pub fn record_job_failed(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
    gauge!(names::JOBS_ACTIVE).decrement(1.0);
}

pub fn record_jobs_reaped(count: usize) {
    counter!(names::JOBS_REAPED_TOTAL).increment(count as u64);
}

/// Record one file converted and how long FFmpeg took.
pub fn record_file_converted(format: &str, duration_secs: f64) {
    let labels = [("format", format.to_string())];
    counter!(names::FILES_CONVERTED_TOTAL, &labels).increment(1);
    histogram!(names::CONVERSION_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_file_failed(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::FILES_FAILED_TOTAL, &labels).increment(1);
}
