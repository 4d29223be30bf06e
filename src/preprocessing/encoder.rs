//! Categorical encoders
//!
//! One-hot encoding for categorical feature columns and label encoding for
//! categorical targets. Both record categories in first-occurrence order.

use crate::table::{CellKey, Scalar};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn distinct_in_order(values: &[Scalar]) -> Vec<Scalar> {
    let mut seen: HashSet<CellKey<'_>> = HashSet::new();
    values
        .iter()
        .filter(|v| !v.is_missing() && seen.insert(v.key()))
        .cloned()
        .collect()
}

/// Position of `value` among `categories`; falls back to the display form so a
/// record sending `"1"` still matches a category stored as a number
fn position(categories: &[Scalar], value: &Scalar) -> Option<usize> {
    if value.is_missing() {
        return None;
    }
    let key = value.key();
    categories.iter().position(|c| c.key() == key).or_else(|| {
        let text = value.to_string();
        let text = text.trim();
        categories.iter().position(|c| c.to_string() == text)
    })
}

/// One-hot encoding of a single categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoding {
    pub column: String,
    pub categories: Vec<Scalar>,
}

impl OneHotEncoding {
    /// Learn the categories of a column
    pub fn fit(column: impl Into<String>, values: &[Scalar]) -> Self {
        Self {
            column: column.into(),
            categories: distinct_in_order(values),
        }
    }

    /// Indicator column names, `<column>_<value>`
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.column, c))
            .collect()
    }

    /// Index of the indicator set for `value`, `None` for unseen values
    pub fn indicator(&self, value: &Scalar) -> Option<usize> {
        position(&self.categories, value)
    }

    /// Encode a column into one indicator vector per category
    pub fn encode(&self, values: &[Scalar]) -> Vec<Vec<f64>> {
        let mut out = vec![vec![0.0; values.len()]; self.categories.len()];
        for (row, v) in values.iter().enumerate() {
            if let Some(idx) = self.indicator(v) {
                out[idx][row] = 1.0;
            }
        }
        out
    }
}

/// Integer encoding of class labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoding {
    pub classes: Vec<Scalar>,
}

impl LabelEncoding {
    pub fn fit(values: &[Scalar]) -> Self {
        Self {
            classes: distinct_in_order(values),
        }
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn encode(&self, value: &Scalar) -> Option<usize> {
        position(&self.classes, value)
    }

    pub fn decode(&self, index: usize) -> Option<&Scalar> {
        self.classes.get(index)
    }
}
