//! End-to-end pipeline: load, clean, analyze, train, store and predict

use crate::analysis::{self, Chart, ColumnSummary, Insights};
use crate::error::{LuminaError, Result};
use crate::inference::InferenceEngine;
use crate::preprocessing::{CleaningConfig, CleaningReport, DataCleaner};
use crate::store::ModelStore;
use crate::table::{CleanTable, RawTable, Record, Scalar};
use crate::training::{ModelSummary, TrainEngine, TrainingConfig};
use crate::utils::data_loader::{DataLoader, DataSaver, TableFormat};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Result of analyzing a dataset
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub insights: Insights,
    pub charts: Vec<Chart>,
    pub model: ModelSummary,
    pub cleaning: CleaningReport,
}

/// Shared entry point used by the HTTP handlers and the CLI
#[derive(Debug, Clone)]
pub struct AnalyticsPipeline {
    cleaner: DataCleaner,
    training: TrainingConfig,
    store: Arc<ModelStore>,
}

impl AnalyticsPipeline {
    pub fn new(store: Arc<ModelStore>) -> Self {
        Self {
            cleaner: DataCleaner::new(),
            training: TrainingConfig::default(),
            store,
        }
    }

    pub fn with_cleaning_config(mut self, config: CleaningConfig) -> Self {
        self.cleaner = DataCleaner::with_config(config);
        self
    }

    pub fn with_training_config(mut self, config: TrainingConfig) -> Self {
        self.training = config;
        self
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Read a table from disk
    pub fn load(&self, path: &Path, format: TableFormat) -> Result<RawTable> {
        DataLoader::new().load(path, format)
    }

    pub fn clean(&self, raw: &RawTable) -> (CleanTable, CleaningReport) {
        self.cleaner.clean_with_report(raw)
    }

    /// Clean a file and encode the result in the same format
    pub fn clean_file(&self, path: &Path, format: TableFormat) -> Result<Vec<u8>> {
        let raw = self.load(path, format)?;
        let (clean, _) = self.clean(&raw);
        DataSaver::to_bytes(&clean, format)
    }

    /// Clean, compute insights, train and store the model.
    ///
    /// `target` overrides automatic target selection. A failed training leaves
    /// the stored model untouched.
    pub fn analyze(&self, raw: &RawTable, target: Option<&str>) -> Result<AnalysisOutcome> {
        let (clean, cleaning) = self.clean(raw);
        let (mut insights, charts) = analysis::analyze(&clean);

        let mut config = self.training.clone();
        if let Some(target) = target {
            config.target_column = Some(target.to_string());
        }
        let (artifact, score) = TrainEngine::new(config).train(&clean)?;
        let artifact = self.store.save(artifact)?;

        insights.model_score = Some(score);
        info!(target = %artifact.target, score, rows = clean.height(), "Analysis complete");

        Ok(AnalysisOutcome {
            insights,
            charts,
            model: artifact.summary(),
            cleaning,
        })
    }

    pub fn analyze_file(&self, path: &Path, format: TableFormat, target: Option<&str>) -> Result<AnalysisOutcome> {
        let raw = self.load(path, format)?;
        self.analyze(&raw, target)
    }

    /// Predict with the current model
    pub fn predict(&self, records: &[Record]) -> Result<Vec<Scalar>> {
        if records.is_empty() {
            return Err(LuminaError::EmptyInput);
        }
        let artifact = self.store.load_latest()?;
        InferenceEngine::new(artifact).predict(records)
    }

    /// Describe every column of an uncleaned file
    pub fn describe_file(&self, path: &Path, format: TableFormat) -> Result<Vec<ColumnSummary>> {
        let raw = self.load(path, format)?;
        Ok(analysis::describe(&raw))
    }

    /// Metadata of the current model
    pub fn current_model(&self) -> Result<ModelSummary> {
        Ok(self.store.load_latest()?.summary())
    }
}
