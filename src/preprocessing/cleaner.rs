//! Data cleaning: RawTable -> CleanTable

use super::config::CleaningConfig;
use crate::table::{CellKey, CleanColumn, CleanTable, ColumnData, ColumnKind, RawTable, Scalar};
use crate::utils::stats;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Why a column was removed during cleaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    AllMissing,
    NotCoercible,
    Constant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedColumn {
    pub name: String,
    pub reason: DropReason,
}

/// Summary of what the cleaner changed
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns_in: usize,
    pub columns_out: usize,
    pub duplicates_removed: usize,
    pub cells_filled: usize,
    pub cells_coerced: usize,
    pub dropped_columns: Vec<DroppedColumn>,
    pub passes: usize,
    pub elapsed_ms: f64,
}

/// Normalizes a raw table into a clean one
#[derive(Debug, Clone, Default)]
pub struct DataCleaner {
    config: CleaningConfig,
}

impl DataCleaner {
    /// Create a cleaner with every step enabled
    pub fn new() -> Self {
        Self::with_config(CleaningConfig::default())
    }

    pub fn with_config(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean a table
    pub fn clean(&self, raw: &RawTable) -> CleanTable {
        self.clean_with_report(raw).0
    }

    /// Clean a table and report what was removed or rewritten
    pub fn clean_with_report(&self, raw: &RawTable) -> (CleanTable, CleaningReport) {
        let start = Instant::now();
        let mut report = CleaningReport {
            rows_in: raw.height(),
            columns_in: raw.width(),
            ..Default::default()
        };

        let mut current = self.pass(raw, &mut report);
        report.passes = 1;

        // Filling can tip a mostly-text column over the numeric threshold, so
        // repeat until a pass leaves the table unchanged
        let max_passes = raw.width() + 2;
        loop {
            if report.passes >= max_passes {
                warn!(passes = report.passes, "Cleaning did not reach a stable table");
                break;
            }
            let next = self.pass(&current.to_raw(), &mut report);
            report.passes += 1;
            if next == current {
                break;
            }
            current = next;
        }

        report.rows_out = current.height();
        report.columns_out = current.width();
        report.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        info!(
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            duplicates_removed = report.duplicates_removed,
            columns_dropped = report.dropped_columns.len(),
            cells_filled = report.cells_filled,
            "Cleaned table"
        );
        (current, report)
    }

    fn pass(&self, raw: &RawTable, report: &mut CleaningReport) -> CleanTable {
        let height = raw.height();

        let keep: Vec<usize> = if self.config.drop_duplicates {
            first_occurrences(height, |row| raw.columns().iter().map(|c| c.values[row].key()).collect())
        } else {
            (0..height).collect()
        };
        if keep.len() < height {
            debug!(removed = height - keep.len(), "Removed duplicate rows");
            report.duplicates_removed += height - keep.len();
        }

        let mut columns = Vec::with_capacity(raw.width());
        for col in raw.columns() {
            let values: Vec<Scalar> = keep.iter().map(|&i| col.values[i].clone()).collect();
            let cleaned = match self.classify(&values) {
                ColumnKind::Numeric => self.clean_numeric(values, report),
                ColumnKind::Categorical => self.clean_categorical(values, report),
            };
            match cleaned {
                Ok(data) => columns.push(CleanColumn {
                    name: col.name.clone(),
                    data,
                }),
                Err(reason) => drop_column(report, &col.name, reason),
            }
        }

        if self.config.drop_constant_columns {
            columns.retain(|c| {
                if is_constant(&c.data) {
                    drop_column(report, &c.name, DropReason::Constant);
                    false
                } else {
                    true
                }
            });
        }

        if columns.is_empty() {
            return CleanTable::from_columns(columns, 0);
        }

        let height = keep.len();
        if self.config.drop_duplicates {
            let rows = first_occurrences(height, |row| columns.iter().map(|c| c.data.key(row)).collect());
            if rows.len() < height {
                report.duplicates_removed += height - rows.len();
                let columns = columns
                    .into_iter()
                    .map(|c| CleanColumn {
                        data: c.data.take(&rows),
                        name: c.name,
                    })
                    .collect();
                return CleanTable::from_columns(columns, rows.len());
            }
        }
        CleanTable::from_columns(columns, height)
    }

    /// Numeric when at least `numeric_threshold` of the non-missing cells parse as numbers
    fn classify(&self, values: &[Scalar]) -> ColumnKind {
        let mut present = 0usize;
        let mut numeric = 0usize;
        for v in values.iter().filter(|v| !v.is_missing()) {
            present += 1;
            if !matches!(v, Scalar::Bool(_)) && v.as_number().is_some() {
                numeric += 1;
            }
        }
        if numeric > 0 && numeric as f64 >= present as f64 * self.config.numeric_threshold {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }

    fn clean_numeric(&self, values: Vec<Scalar>, report: &mut CleaningReport) -> Result<ColumnData, DropReason> {
        if values.iter().all(|v| v.is_missing()) {
            return Err(DropReason::AllMissing);
        }

        let parsed: Vec<Option<f64>> = values
            .iter()
            .map(|v| match v {
                Scalar::Number(x) if x.is_finite() => Some(*x),
                Scalar::Text(_) if self.config.coerce_types => v.as_number(),
                _ => None,
            })
            .collect();

        let present: Vec<f64> = parsed.iter().flatten().copied().collect();
        let mean = match stats::mean(&present) {
            Some(m) => m,
            None => return Err(DropReason::NotCoercible),
        };

        let failures = parsed.iter().filter(|p| p.is_none()).count();
        let has_unconverted_text = !self.config.coerce_types && values.iter().any(|v| matches!(v, Scalar::Text(_)));
        if has_unconverted_text || (failures > 0 && !self.config.fill_missing) {
            // Without coercion or filling the column cannot be held as plain numbers
            let kept = values
                .into_iter()
                .zip(&parsed)
                .map(|(v, p)| match (p, self.config.coerce_types) {
                    (Some(x), true) => Scalar::Number(*x),
                    (None, true) => Scalar::Missing,
                    (_, false) => v,
                })
                .collect();
            return self.clean_categorical(kept, report);
        }

        report.cells_coerced += values
            .iter()
            .zip(&parsed)
            .filter(|(v, p)| matches!(v, Scalar::Text(_)) && p.is_some())
            .count();
        report.cells_filled += failures;

        Ok(ColumnData::Numeric(parsed.into_iter().map(|p| p.unwrap_or(mean)).collect()))
    }

    fn clean_categorical(&self, mut values: Vec<Scalar>, report: &mut CleaningReport) -> Result<ColumnData, DropReason> {
        if values.iter().all(|v| v.is_missing()) {
            return Err(DropReason::AllMissing);
        }

        if self.config.fill_missing {
            if let Some(mode) = stats::mode(&values) {
                for v in values.iter_mut().filter(|v| v.is_missing()) {
                    *v = mode.clone();
                    report.cells_filled += 1;
                }
            }
        }

        if self.config.strip_whitespace {
            for v in values.iter_mut() {
                if let Scalar::Text(s) = v {
                    let trimmed = s.trim();
                    if trimmed.len() != s.len() {
                        *s = trimmed.to_string();
                    }
                }
            }
        }

        Ok(ColumnData::Categorical(values))
    }
}

fn drop_column(report: &mut CleaningReport, name: &str, reason: DropReason) {
    debug!(column = %name, ?reason, "Dropped column");
    report.dropped_columns.push(DroppedColumn {
        name: name.to_string(),
        reason,
    });
}

/// Non-missing values all identical (or none at all)
fn is_constant(data: &ColumnData) -> bool {
    let mut first: Option<CellKey<'_>> = None;
    for row in 0..data.len() {
        let key = data.key(row);
        if key == CellKey::Missing {
            continue;
        }
        match first {
            None => first = Some(key),
            Some(f) if f != key => return false,
            Some(_) => {}
        }
    }
    true
}

/// Indices of the first occurrence of each distinct row
fn first_occurrences<'a, F>(height: usize, row_key: F) -> Vec<usize>
where
    F: Fn(usize) -> Vec<CellKey<'a>>,
{
    let mut seen: HashSet<Vec<CellKey<'a>>> = HashSet::with_capacity(height);
    (0..height).filter(|&row| seen.insert(row_key(row))).collect()
}
