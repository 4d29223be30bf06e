//! Lumina - tabular data analytics service
//!
//! Accepts an arbitrary tabular dataset, cleans it, infers a prediction target
//! without a declared schema, trains a model, persists it, and answers
//! predictions for schema-less records.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`table`] - Raw and clean tables, cells and prediction records
//! - [`preprocessing`] - Cleaning, encoding and target selection
//! - [`training`] - Random forest and decision tree training
//! - [`store`] - Single-slot persistent model store
//! - [`inference`] - Record alignment and prediction
//! - [`analysis`] - Correlations, chart data and descriptive statistics
//! - [`pipeline`] - End-to-end orchestration shared by the server and CLI
//!
//! ## Services
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface
//!
//! ## Utilities
//! - [`utils`] - File loading and saving, summary statistics

// Core error handling
pub mod error;

// Data model
pub mod table;

// Core pipeline modules
pub mod preprocessing;
pub mod training;
pub mod store;
pub mod inference;
pub mod analysis;
pub mod pipeline;

// Utilities
pub mod utils;

// Services
pub mod server;
pub mod cli;

pub use error::{LuminaError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{LuminaError, Result};

    // Data model
    pub use crate::table::{CleanTable, Column, ColumnKind, RawTable, Record, Scalar};

    // Preprocessing
    pub use crate::preprocessing::{select_target, CleaningConfig, CleaningReport, DataCleaner, TargetSelection};

    // Training
    pub use crate::training::{FittedArtifact, ModelSummary, TaskType, TrainEngine, TrainingConfig};

    // Storage and inference
    pub use crate::store::ModelStore;
    pub use crate::inference::InferenceEngine;

    // Orchestration
    pub use crate::pipeline::{AnalysisOutcome, AnalyticsPipeline};

    // Files
    pub use crate::utils::{DataLoader, DataSaver, TableFormat};
}
