//! Target and feature selection

use crate::error::{LuminaError, Result};
use crate::table::{CleanTable, ColumnKind};
use crate::utils::stats;
use serde::{Deserialize, Serialize};
use tracing::info;

/// The column to predict and the columns used to predict it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSelection {
    pub target: String,
    pub target_kind: ColumnKind,
    /// Feature columns in table order
    pub features: Vec<String>,
}

/// Pick the numeric column with the largest sample variance as the target.
///
/// Ties keep the earliest column. The other numeric columns become features.
pub fn select_target(table: &CleanTable) -> Result<TargetSelection> {
    let mut best: Option<(&str, f64)> = None;
    for (name, values) in table.numeric_columns() {
        let variance = stats::sample_variance(values);
        let better = match best {
            None => true,
            Some((_, best_var)) => variance > best_var || (best_var.is_nan() && !variance.is_nan()),
        };
        if better {
            best = Some((name, variance));
        }
    }

    let (target, variance) = best.ok_or(LuminaError::NoTargetFound)?;
    let features: Vec<String> = table
        .numeric_columns()
        .map(|(name, _)| name)
        .filter(|name| *name != target)
        .map(str::to_string)
        .collect();

    info!(target = %target, variance, features = features.len(), "Selected target column");

    Ok(TargetSelection {
        target: target.to_string(),
        target_kind: ColumnKind::Numeric,
        features,
    })
}

/// Use the named column as the target and every other column as a feature
pub fn select_explicit(table: &CleanTable, target: &str) -> Result<TargetSelection> {
    let column = table
        .column(target)
        .ok_or_else(|| LuminaError::TargetNotFound(target.to_string()))?;

    let features: Vec<String> = table
        .column_names()
        .into_iter()
        .filter(|name| name != target)
        .collect();

    info!(target = %target, kind = ?column.kind(), features = features.len(), "Using requested target column");

    Ok(TargetSelection {
        target: target.to_string(),
        target_kind: column.kind(),
        features,
    })
}
