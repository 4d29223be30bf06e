//! Training configuration

use super::random_forest::MaxFeatures;
use serde::{Deserialize, Serialize};

/// Kind of model fitted for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Numeric target, random forest regressor
    Regression,
    /// Categorical or boolean target, decision tree classifier
    Classification,
}

/// Configuration for model training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Target column name (None = numeric column with the largest variance)
    pub target_column: Option<String>,

    /// Share of rows held out for scoring
    pub test_size: f64,

    /// Seed for the split and the model
    pub random_state: u64,

    /// Number of trees in the regression forest
    pub n_estimators: usize,

    /// Maximum tree depth (None = grow until pure)
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node
    pub min_samples_split: usize,

    /// Minimum samples in a leaf
    pub min_samples_leaf: usize,

    /// Features sampled at each split
    pub max_features: MaxFeatures,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: None,
            test_size: 0.2,
            random_state: 42,
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to name the target column
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = Some(target.into());
        self
    }

    /// Builder method to set the held-out share
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the number of trees
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators.max(1);
        self
    }

    /// Builder method to limit tree depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Builder method to set the minimum leaf size
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Builder method to set the feature sampling strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }
}
