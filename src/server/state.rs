//! Application state management

use crate::error::Result;
use crate::pipeline::AnalyticsPipeline;
use crate::store::ModelStore;
use std::sync::Arc;

use super::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub pipeline: AnalyticsPipeline,
}

impl AppState {
    /// Create the upload spool directory and open the model store
    pub fn new(config: ServerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let store = Arc::new(ModelStore::open(&config.models_dir)?);
        Ok(Self {
            pipeline: AnalyticsPipeline::new(store),
            config,
        })
    }
}
