//! Wiring of the job reaper into the server.

use tokio::task::JoinHandle;
use vaudio_worker::{ConversionService, JobReaper};

/// Start the reaper loop for `service` as a background task.
pub fn spawn_job_reaper(service: &ConversionService) -> JoinHandle<()> {
    let config = service.config();
    let reaper = JobReaper::new(service.store().clone(), config.job_ttl, config.reaper_interval)
        .with_enabled(config.enable_job_reaper);

    tokio::spawn(async move {
        reaper.run().await;
    })
}
