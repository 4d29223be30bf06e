//! Model training module
//!
//! - Random forest regression for numeric targets
//! - Decision tree classification for categorical targets
//! - Seeded train/test split and held-out scoring (R² or accuracy)

mod artifact;
mod config;
mod engine;
mod models;
pub mod decision_tree;
pub mod random_forest;

pub use artifact::{FittedArtifact, ModelSummary, TrainedModel};
pub use config::{TaskType, TrainingConfig};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use engine::{split_indices, train, TrainEngine};
pub use models::ModelMetrics;
pub use random_forest::{MaxFeatures, RandomForest};
