//! Inference engine implementation
//!
//! Turns schema-less records into the matrix an artifact was trained on:
//! - union of record keys, absent keys treated as missing
//! - categorical columns expanded to the training-time indicators
//! - every cell coerced to a number (0 when not numeric)
//! - columns aligned to the feature schema; unknown columns ignored,
//!   absent features filled with zeros

use crate::error::{LuminaError, Result};
use crate::table::{Record, Scalar};
use crate::training::FittedArtifact;
use ndarray::Array2;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Applies one artifact to batches of records
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    artifact: Arc<FittedArtifact>,
}

impl InferenceEngine {
    pub fn new(artifact: Arc<FittedArtifact>) -> Self {
        Self { artifact }
    }

    pub fn artifact(&self) -> &FittedArtifact {
        &self.artifact
    }

    /// Predict one value per record, in input order
    pub fn predict(&self, records: &[Record]) -> Result<Vec<Scalar>> {
        if records.is_empty() {
            return Err(LuminaError::EmptyInput);
        }
        let x = self.build_matrix(records);
        self.artifact.predict_matrix(&x)
    }

    /// Build the aligned feature matrix for `records`
    pub fn build_matrix(&self, records: &[Record]) -> Array2<f64> {
        let n_rows = records.len();

        // Union of keys, first-seen order
        let mut names: Vec<&str> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !names.contains(&key) {
                    names.push(key);
                }
            }
        }

        let mut numeric: HashMap<String, Vec<f64>> = HashMap::with_capacity(names.len());
        for name in &names {
            let values = records
                .iter()
                .map(|r| r.get(name).map_or(0.0, Scalar::coerce_number))
                .collect();
            numeric.insert(name.to_string(), values);
        }

        // Indicator columns take precedence over raw input columns of the same name
        for encoding in &self.artifact.encodings {
            if !names.contains(&encoding.column.as_str()) {
                continue;
            }
            let column: Vec<Scalar> = records
                .iter()
                .map(|r| r.get(&encoding.column).cloned().unwrap_or(Scalar::Missing))
                .collect();
            numeric.remove(&encoding.column);
            for (name, values) in encoding.feature_names().into_iter().zip(encoding.encode(&column)) {
                numeric.insert(name, values);
            }
        }

        let schema = &self.artifact.feature_schema;
        let mut x = Array2::zeros((n_rows, schema.len()));
        let mut synthesized = 0usize;
        for (j, feature) in schema.iter().enumerate() {
            match numeric.get(feature) {
                Some(values) => {
                    for (i, &v) in values.iter().enumerate() {
                        x[[i, j]] = v;
                    }
                }
                None => synthesized += 1,
            }
        }

        debug!(
            rows = n_rows,
            input_columns = names.len(),
            synthesized_features = synthesized,
            "Aligned records to feature schema"
        );
        x
    }
}

/// Predict with an artifact directly
pub fn predict(artifact: Arc<FittedArtifact>, records: &[Record]) -> Result<Vec<Scalar>> {
    InferenceEngine::new(artifact).predict(records)
}
