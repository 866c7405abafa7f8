//! Application state.

use std::sync::Arc;

use vaudio_media::MediaConverter;
use vaudio_worker::{ConversionService, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub service: ConversionService,
}

impl AppState {
    /// Create state backed by the FFmpeg converter.
    pub fn new(config: ApiConfig, worker_config: WorkerConfig) -> Self {
        Self {
            config,
            service: ConversionService::new(worker_config),
        }
    }

    /// Create state with a custom converter.
    pub fn with_converter(
        config: ApiConfig,
        worker_config: WorkerConfig,
        converter: Arc<dyn MediaConverter>,
    ) -> Self {
        Self {
            config,
            service: ConversionService::with_converter(worker_config, converter),
        }
    }
}
