//! Background services.

pub mod job_reaper;

pub use job_reaper::spawn_job_reaper;
