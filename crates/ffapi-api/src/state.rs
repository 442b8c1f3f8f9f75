//! Application state.

use std::sync::Arc;

use ffapi_storage::{S3StoreFactory, StoreFactory};
use ffapi_worker::{JobExecutor, WorkerConfig};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub executor: Arc<JobExecutor>,
    /// Builds a store client from each request's credentials
    pub stores: Arc<dyn StoreFactory>,
}

impl AppState {
    /// Create state that runs FFmpeg and talks to S3.
    pub fn new(config: ApiConfig, worker: WorkerConfig) -> ApiResult<Self> {
        let executor = JobExecutor::from_config(worker).map_err(ApiError::from)?;
        Ok(Self::with_components(
            config,
            executor,
            Arc::new(S3StoreFactory),
        ))
    }

    /// Create state from prebuilt parts.
    pub fn with_components(
        config: ApiConfig,
        executor: JobExecutor,
        stores: Arc<dyn StoreFactory>,
    ) -> Self {
        Self {
            config,
            executor: Arc::new(executor),
            stores,
        }
    }
}
