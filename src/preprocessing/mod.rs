//! Data preprocessing module
//!
//! - Cleaning of raw tables (deduplication, missing values, whitespace,
//!   numeric coercion, zero-variance pruning)
//! - Target and feature selection
//! - Categorical encoding (one-hot features, label-encoded targets)

mod cleaner;
mod config;
mod encoder;
mod selector;

pub use cleaner::{CleaningReport, DataCleaner, DropReason, DroppedColumn};
pub use config::CleaningConfig;
pub use encoder::{LabelEncoding, OneHotEncoding};
pub use selector::{select_explicit, select_target, TargetSelection};
