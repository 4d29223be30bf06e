//! Fitted model plus everything needed to apply it to new records

use super::config::TaskType;
use super::decision_tree::DecisionTree;
use super::models::ModelMetrics;
use super::random_forest::RandomForest;
use crate::error::{LuminaError, Result};
use crate::preprocessing::{LabelEncoding, OneHotEncoding};
use crate::table::Scalar;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// The fitted estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    Regression(RandomForest),
    Classification { tree: DecisionTree, labels: LabelEncoding },
}

impl TrainedModel {
    pub fn task_type(&self) -> TaskType {
        match self {
            TrainedModel::Regression(_) => TaskType::Regression,
            TrainedModel::Classification { .. } => TaskType::Classification,
        }
    }

    fn feature_importances(&self) -> Option<&Array1<f64>> {
        match self {
            TrainedModel::Regression(forest) => forest.feature_importances(),
            TrainedModel::Classification { tree, .. } => tree.feature_importances(),
        }
    }
}

/// Trained model with its feature schema and training metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedArtifact {
    /// Target column the model predicts
    pub target: String,
    /// Fitted column names, in matrix order (one-hot names included)
    pub feature_schema: Vec<String>,
    /// Categorical feature columns expanded to indicators at training time
    pub encodings: Vec<OneHotEncoding>,
    pub model: TrainedModel,
    /// R² or accuracy on the held-out rows
    pub score: f64,
    pub metrics: ModelMetrics,
    pub n_train: usize,
    pub n_test: usize,
    pub created_at: DateTime<Utc>,
}

impl FittedArtifact {
    pub fn task_type(&self) -> TaskType {
        self.model.task_type()
    }

    /// Predict for a matrix already aligned to `feature_schema`
    pub fn predict_matrix(&self, x: &Array2<f64>) -> Result<Vec<Scalar>> {
        if x.ncols() != self.feature_schema.len() {
            return Err(LuminaError::ShapeError {
                expected: format!("{} features", self.feature_schema.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        match &self.model {
            TrainedModel::Regression(forest) => Ok(forest.predict(x)?.into_iter().map(Scalar::Number).collect()),
            TrainedModel::Classification { tree, labels } => tree
                .predict(x)?
                .into_iter()
                .map(|code| {
                    labels.decode(code as usize).cloned().ok_or_else(|| {
                        LuminaError::ComputationError(format!("predicted unknown class index {}", code))
                    })
                })
                .collect(),
        }
    }

    /// Metadata for display, without the fitted trees
    pub fn summary(&self) -> ModelSummary {
        let feature_importances = self
            .model
            .feature_importances()
            .map(|imp| {
                self.feature_schema
                    .iter()
                    .cloned()
                    .zip(imp.iter().copied())
                    .collect()
            })
            .unwrap_or_default();

        let classes = match &self.model {
            TrainedModel::Classification { labels, .. } => Some(labels.classes.iter().map(Scalar::to_json).collect()),
            TrainedModel::Regression(_) => None,
        };

        ModelSummary {
            target: self.target.clone(),
            task_type: self.task_type(),
            features: self.feature_schema.clone(),
            score: self.score,
            metrics: self.metrics.clone(),
            n_train: self.n_train,
            n_test: self.n_test,
            created_at: self.created_at,
            feature_importances,
            classes,
        }
    }
}

/// Serializable description of an artifact
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub target: String,
    pub task_type: TaskType,
    pub features: Vec<String>,
    pub score: f64,
    pub metrics: ModelMetrics,
    pub n_train: usize,
    pub n_test: usize,
    pub created_at: DateTime<Utc>,
    pub feature_importances: Vec<(String, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<serde_json::Value>>,
}
