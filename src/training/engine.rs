//! Training engine: target selection, seeded split, fit and evaluation

use super::artifact::{FittedArtifact, TrainedModel};
use super::config::TrainingConfig;
use super::decision_tree::DecisionTree;
use super::models::ModelMetrics;
use super::random_forest::RandomForest;
use crate::error::{LuminaError, Result};
use crate::preprocessing::{select_explicit, select_target, LabelEncoding, OneHotEncoding, TargetSelection};
use crate::table::{CleanTable, ColumnData, ColumnKind};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use tracing::{debug, info};

/// Seeded shuffle of `0..n`; the first `floor(n * test_size)` indices form the test set.
///
/// Returns `(train, test)`.
pub fn split_indices(n: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_size).floor() as usize;
    let train = indices.split_off(n_test.min(n));
    (train, indices)
}

/// Feature matrix built from a clean table
struct FeatureMatrix {
    x: Array2<f64>,
    names: Vec<String>,
    encodings: Vec<OneHotEncoding>,
}

fn build_features(table: &CleanTable, features: &[String]) -> Result<FeatureMatrix> {
    let mut columns: Vec<Vec<f64>> = Vec::new();
    let mut names = Vec::new();
    let mut encodings = Vec::new();

    for name in features {
        let column = table
            .column(name)
            .ok_or_else(|| LuminaError::TargetNotFound(name.clone()))?;
        match &column.data {
            ColumnData::Numeric(values) => {
                columns.push(values.clone());
                names.push(name.clone());
            }
            ColumnData::Categorical(values) => {
                let encoding = OneHotEncoding::fit(name.as_str(), values);
                columns.extend(encoding.encode(values));
                names.extend(encoding.feature_names());
                encodings.push(encoding);
            }
        }
    }

    let height = table.height();
    let mut x = Array2::zeros((height, columns.len()));
    for (j, values) in columns.iter().enumerate() {
        for (i, &v) in values.iter().enumerate() {
            x[[i, j]] = v;
        }
    }

    Ok(FeatureMatrix { x, names, encodings })
}

/// Trains one model per call on a clean table
#[derive(Debug, Clone, Default)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Select the target, split, fit and score. Returns the artifact and its score.
    pub fn train(&self, table: &CleanTable) -> Result<(FittedArtifact, f64)> {
        let start = Instant::now();

        let selection = match &self.config.target_column {
            Some(target) => select_explicit(table, target)?,
            None => select_target(table)?,
        };

        let n = table.height();
        if n < 2 {
            return Err(LuminaError::InsufficientData(format!(
                "{} row(s) after cleaning, at least 2 are needed",
                n
            )));
        }

        let (train_idx, test_idx) = split_indices(n, self.config.test_size, self.config.random_state);
        if train_idx.is_empty() || test_idx.is_empty() {
            return Err(LuminaError::InsufficientData(format!(
                "{} rows give {} training and {} test rows",
                n,
                train_idx.len(),
                test_idx.len()
            )));
        }

        let features = build_features(table, &selection.features)?;
        if features.names.is_empty() {
            return Err(LuminaError::AllFeaturesDegenerate {
                target: selection.target.clone(),
            });
        }
        debug!(
            train_rows = train_idx.len(),
            test_rows = test_idx.len(),
            features = features.names.len(),
            "Prepared training data"
        );

        let x_train = features.x.select(Axis(0), &train_idx);
        let x_test = features.x.select(Axis(0), &test_idx);

        let (model, mut metrics) = self.fit_model(table, &selection, &x_train, &x_test, &train_idx, &test_idx)?;
        metrics.training_time_secs = start.elapsed().as_secs_f64();
        metrics.n_features = features.names.len();
        let score = metrics.score();

        info!(
            target = %selection.target,
            task = ?model.task_type(),
            train_rows = train_idx.len(),
            test_rows = test_idx.len(),
            score,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Trained model"
        );

        let artifact = FittedArtifact {
            target: selection.target,
            feature_schema: features.names,
            encodings: features.encodings,
            model,
            score,
            metrics,
            n_train: train_idx.len(),
            n_test: test_idx.len(),
            created_at: chrono::Utc::now(),
        };
        Ok((artifact, score))
    }

    fn fit_model(
        &self,
        table: &CleanTable,
        selection: &TargetSelection,
        x_train: &Array2<f64>,
        x_test: &Array2<f64>,
        train_idx: &[usize],
        test_idx: &[usize],
    ) -> Result<(TrainedModel, ModelMetrics)> {
        let target = table
            .column(&selection.target)
            .ok_or_else(|| LuminaError::TargetNotFound(selection.target.clone()))?;

        match (&target.data, selection.target_kind) {
            (ColumnData::Numeric(values), ColumnKind::Numeric) => {
                let y = Array1::from_vec(values.clone());
                let y_train = y.select(Axis(0), train_idx);
                let y_test = y.select(Axis(0), test_idx);

                let mut forest = RandomForest::new(self.config.n_estimators)
                    .with_max_depth(self.config.max_depth)
                    .with_min_samples_split(self.config.min_samples_split)
                    .with_min_samples_leaf(self.config.min_samples_leaf)
                    .with_max_features(self.config.max_features)
                    .with_random_state(self.config.random_state);
                forest.fit(x_train, &y_train)?;

                let metrics = ModelMetrics::compute_regression(&y_test, &forest.predict(x_test)?);
                Ok((TrainedModel::Regression(forest), metrics))
            }
            (ColumnData::Categorical(values), _) => {
                let labels = LabelEncoding::fit(values);
                let codes: Vec<f64> = values
                    .iter()
                    .map(|v| labels.encode(v).map(|c| c as f64))
                    .collect::<Option<_>>()
                    .ok_or_else(|| LuminaError::TrainingError(format!("unencodable value in '{}'", selection.target)))?;
                let y = Array1::from_vec(codes);
                let y_train = y.select(Axis(0), train_idx);
                let y_test = y.select(Axis(0), test_idx);

                let mut tree = DecisionTree::new_classifier()
                    .with_max_depth(self.config.max_depth)
                    .with_min_samples_split(self.config.min_samples_split)
                    .with_min_samples_leaf(self.config.min_samples_leaf)
                    .with_random_state(self.config.random_state);
                tree.fit(x_train, &y_train)?;

                let metrics = ModelMetrics::compute_classification(&y_test, &tree.predict(x_test)?);
                Ok((TrainedModel::Classification { tree, labels }, metrics))
            }
            (ColumnData::Numeric(_), ColumnKind::Categorical) => Err(LuminaError::TrainingError(format!(
                "column '{}' changed kind during training",
                selection.target
            ))),
        }
    }
}

/// Train with the default configuration
pub fn train(table: &CleanTable) -> Result<(FittedArtifact, f64)> {
    TrainEngine::default().train(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::DataCleaner;
    use crate::table::{Column, RawTable, Scalar};
    use crate::training::TaskType;

    fn clean(columns: Vec<Column>) -> CleanTable {
        DataCleaner::new().clean(&RawTable::new(columns).unwrap())
    }

    fn linear_table(n: usize) -> CleanTable {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let z: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 10.0).collect();
        clean(vec![Column::numeric("x", &x), Column::numeric("z", &z), Column::numeric("y", &y)])
    }

    #[test]
    fn test_split_sizes() {
        let (train, test) = split_indices(10, 0.2, 42);
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 8);

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        assert_eq!(split_indices(10, 0.2, 42), (train, test));
        assert!(split_indices(4, 0.2, 42).1.is_empty());
    }

    #[test]
    fn test_train_regression() {
        let table = linear_table(40);
        let (artifact, score) = train(&table).unwrap();

        assert_eq!(artifact.target, "y");
        assert_eq!(artifact.feature_schema, vec!["x", "z"]);
        assert_eq!(artifact.task_type(), TaskType::Regression);
        assert_eq!(artifact.n_test, 8);
        assert_eq!(artifact.n_train, 32);
        assert!(score > 0.8, "score too low: {}", score);
    }

    #[test]
    fn test_train_is_deterministic() {
        let table = linear_table(30);
        let engine = TrainEngine::new(TrainingConfig::new().with_n_estimators(10));
        let (_, a) = engine.train(&table).unwrap();
        let (_, b) = engine.train(&table).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_insufficient_data() {
        let table = clean(vec![
            Column::numeric("age", &[25.0, 30.0, 25.0]),
            Column::numeric("income", &[50000.0, 60000.0, 50000.0]),
            Column::text("city", &["NY", "LA", "NY"]),
        ]);
        assert_eq!(table.height(), 2);
        assert!(matches!(train(&table), Err(LuminaError::InsufficientData(_))));
    }

    #[test]
    fn test_no_features() {
        let table = clean(vec![Column::numeric("only", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])]);
        assert!(matches!(
            train(&table),
            Err(LuminaError::AllFeaturesDegenerate { target }) if target == "only"
        ));
    }

    #[test]
    fn test_no_target() {
        let table = clean(vec![Column::text("city", &["NY", "LA", "SF"])]);
        assert!(matches!(train(&table), Err(LuminaError::NoTargetFound)));
    }

    #[test]
    fn test_train_classification_with_one_hot() {
        let n = 30;
        let size: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let color: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "red" } else { "blue" }).collect();
        let label: Vec<&str> = (0..n).map(|i| if i < 15 { "small" } else { "large" }).collect();
        let table = clean(vec![
            Column::numeric("size", &size),
            Column::text("color", &color),
            Column::text("label", &label),
        ]);

        let engine = TrainEngine::new(TrainingConfig::new().with_target("label"));
        let (artifact, score) = engine.train(&table).unwrap();

        assert_eq!(artifact.task_type(), TaskType::Classification);
        assert_eq!(artifact.feature_schema, vec!["size", "color_red", "color_blue"]);
        assert_eq!(artifact.encodings.len(), 1);
        assert!(score >= 0.8, "accuracy too low: {}", score);

        let x = Array2::from_shape_vec((1, 3), vec![2.0, 1.0, 0.0]).unwrap();
        assert_eq!(artifact.predict_matrix(&x).unwrap(), vec![Scalar::from("small")]);
    }
}
