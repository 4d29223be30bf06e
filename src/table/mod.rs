//! Tabular data model
//!
//! - [`Scalar`] - a single heterogeneous cell value
//! - [`RawTable`] - named columns of scalars as produced by a table reader
//! - [`CleanTable`] - the cleaner's output, with numeric columns stored as `f64`
//! - [`Record`] - a schema-less row submitted for prediction

use crate::error::{LuminaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Bool(bool),
    Missing,
}

impl Scalar {
    pub fn is_missing(&self) -> bool {
        match self {
            Scalar::Missing => true,
            Scalar::Number(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Numeric value of the cell: numbers as-is, text if it parses as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(v) if v.is_finite() => Some(*v),
            Scalar::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Lossy numeric view used when building prediction matrices
    pub fn coerce_number(&self) -> f64 {
        match self {
            Scalar::Bool(true) => 1.0,
            Scalar::Bool(false) => 0.0,
            other => other.as_number().unwrap_or(0.0),
        }
    }

    /// Convert to a plain JSON value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Number(v) if v.is_finite() => serde_json::json!(v),
            Scalar::Number(_) | Scalar::Missing => serde_json::Value::Null,
            Scalar::Text(s) => serde_json::Value::String(s.clone()),
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
        }
    }

    /// Build a scalar from a JSON value; nested values are kept as their JSON text
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Scalar::Missing,
            serde_json::Value::Bool(b) => Scalar::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map(Scalar::Number).unwrap_or(Scalar::Missing),
            serde_json::Value::String(s) => Scalar::Text(s.clone()),
            other => Scalar::Text(other.to_string()),
        }
    }

    /// Hashable identity of the cell, used for duplicate detection and counting
    pub fn key(&self) -> CellKey<'_> {
        match self {
            Scalar::Number(v) => CellKey::number(*v),
            Scalar::Text(s) => CellKey::Text(s),
            Scalar::Bool(b) => CellKey::Bool(*b),
            Scalar::Missing => CellKey::Missing,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(v) => write!(f, "{}", v),
            Scalar::Text(s) => write!(f, "{}", s),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Missing => Ok(()),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Hashable cell identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKey<'a> {
    Number(u64),
    Text(&'a str),
    Bool(bool),
    Missing,
}

impl CellKey<'static> {
    pub fn number(v: f64) -> Self {
        if v.is_nan() {
            CellKey::Missing
        } else if v == 0.0 {
            // -0.0 and 0.0 compare equal, so they must share a key
            CellKey::Number(0.0f64.to_bits())
        } else {
            CellKey::Number(v.to_bits())
        }
    }
}

/// Parse text as a finite number, accepting surrounding whitespace and
/// comma thousands separators ("1,234.5")
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = trimmed.parse::<f64>().ok().or_else(|| {
        if trimmed.contains(',') && !trimmed.contains(",,") && !trimmed.starts_with(',') {
            trimmed.replace(',', "").parse::<f64>().ok()
        } else {
            None
        }
    })?;
    parsed.is_finite().then_some(parsed)
}

/// A named column of raw cells
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self { name: name.into(), values }
    }

    pub fn numeric(name: impl Into<String>, values: &[f64]) -> Self {
        Self::new(name, values.iter().map(|&v| Scalar::Number(v)).collect())
    }

    pub fn text(name: impl Into<String>, values: &[&str]) -> Self {
        Self::new(name, values.iter().map(|&s| Scalar::from(s)).collect())
    }
}

/// Uncleaned table as delivered by a reader
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    columns: Vec<Column>,
}

impl RawTable {
    /// Build a table, checking that names are unique and columns have equal length
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(LuminaError::UnreadableFile(format!("duplicate column name '{}'", col.name)));
            }
        }
        if let Some(first) = columns.first() {
            let height = first.values.len();
            if let Some(bad) = columns.iter().find(|c| c.values.len() != height) {
                return Err(LuminaError::ShapeError {
                    expected: format!("{} rows", height),
                    actual: format!("{} rows in column '{}'", bad.values.len(), bad.name),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Build a table from row-major data
    pub fn from_rows(names: &[&str], rows: Vec<Vec<Scalar>>) -> Result<Self> {
        let mut columns: Vec<Column> = names.iter().map(|n| Column::new(*n, Vec::with_capacity(rows.len()))).collect();
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(LuminaError::ShapeError {
                    expected: format!("{} cells per row", names.len()),
                    actual: format!("{} cells in row {}", row.len(), i),
                });
            }
            for (col, cell) in columns.iter_mut().zip(row) {
                col.values.push(cell);
            }
        }
        Self::new(columns)
    }

    pub fn height(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}

/// Kind of a cleaned column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Values of a cleaned column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Categorical(Vec<Scalar>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn cell(&self, row: usize) -> Scalar {
        match self {
            ColumnData::Numeric(v) => Scalar::Number(v[row]),
            ColumnData::Categorical(v) => v[row].clone(),
        }
    }

    pub fn key(&self, row: usize) -> CellKey<'_> {
        match self {
            ColumnData::Numeric(v) => CellKey::number(v[row]),
            ColumnData::Categorical(v) => v[row].key(),
        }
    }

    /// Keep only the given rows, in the given order
    pub fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Categorical(v) => ColumnData::Categorical(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// A cleaned column
#[derive(Debug, Clone, PartialEq)]
pub struct CleanColumn {
    pub name: String,
    pub data: ColumnData,
}

impl CleanColumn {
    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Categorical(_) => None,
        }
    }
}

/// Output of the cleaner: no duplicate rows, no missing cells, no constant columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CleanTable {
    columns: Vec<CleanColumn>,
    height: usize,
}

impl CleanTable {
    pub(crate) fn from_columns(columns: Vec<CleanColumn>, height: usize) -> Self {
        debug_assert!(columns.iter().all(|c| c.data.len() == height));
        Self { columns, height }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[CleanColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&CleanColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Numeric columns in table order
    pub fn numeric_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .filter_map(|c| c.as_numeric().map(|v| (c.name.as_str(), v)))
    }

    /// Categorical columns in table order
    pub fn categorical_columns(&self) -> impl Iterator<Item = (&str, &[Scalar])> {
        self.columns.iter().filter_map(|c| match &c.data {
            ColumnData::Categorical(v) => Some((c.name.as_str(), v.as_slice())),
            ColumnData::Numeric(_) => None,
        })
    }

    /// Convert back into a raw table (for writing or re-cleaning)
    pub fn to_raw(&self) -> RawTable {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = match &c.data {
                    ColumnData::Numeric(v) => v.iter().map(|&x| Scalar::Number(x)).collect(),
                    ColumnData::Categorical(v) => v.clone(),
                };
                Column::new(c.name.clone(), values)
            })
            .collect();
        RawTable { columns }
    }
}

/// A schema-less input row: ordered, key-unique mapping of column name to cell
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Scalar)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing any previous value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: Scalar) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from a JSON object
    pub fn from_json_object(obj: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut record = Self::new();
        for (k, v) in obj {
            record.insert(k.clone(), Scalar::from_json(v));
        }
        record
    }
}
