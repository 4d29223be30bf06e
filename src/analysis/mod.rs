//! Exploratory statistics and chart data
//!
//! Charts are returned as data series for the client to draw; nothing here
//! renders images.

use crate::table::{CleanTable, ColumnData, ColumnKind, RawTable, Scalar};
use crate::utils::stats;
use serde::Serialize;

/// Number of histogram bins
pub const HISTOGRAM_BINS: usize = 10;
/// Categories shown in a distribution chart
pub const TOP_CATEGORIES: usize = 5;

/// Pearson correlations between numeric columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major; `None` where a coefficient is undefined
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Per-column summary in the shape of a `describe()` table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub kind: ColumnKind,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(rename = "25%", skip_serializing_if = "Option::is_none")]
    pub q25: Option<f64>,
    #[serde(rename = "50%", skip_serializing_if = "Option::is_none")]
    pub q50: Option<f64>,
    #[serde(rename = "75%", skip_serializing_if = "Option::is_none")]
    pub q75: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ColumnSummary {
    fn numeric(column: &str, values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let std = stats::sample_std(values);
        Self {
            column: column.to_string(),
            kind: ColumnKind::Numeric,
            count: values.len(),
            unique: None,
            top: None,
            freq: None,
            mean: stats::mean(values),
            std: std.is_finite().then_some(std),
            min: sorted.first().copied(),
            q25: stats::quantile_sorted(&sorted, 0.25),
            q50: stats::quantile_sorted(&sorted, 0.5),
            q75: stats::quantile_sorted(&sorted, 0.75),
            max: sorted.last().copied(),
        }
    }

    fn categorical(column: &str, values: &[Scalar]) -> Self {
        let counts = stats::value_counts(values);
        let (top, freq) = match counts.first() {
            Some((value, count)) => (Some(value.to_json()), Some(*count)),
            None => (None, None),
        };
        Self {
            column: column.to_string(),
            kind: ColumnKind::Categorical,
            count: values.iter().filter(|v| !v.is_missing()).count(),
            unique: Some(counts.len()),
            top,
            freq,
            mean: None,
            std: None,
            min: None,
            q25: None,
            q50: None,
            q75: None,
            max: None,
        }
    }
}

/// One histogram bar covering `(lower, upper]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// One slice of a category distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub value: serde_json::Value,
    pub count: usize,
    /// Share of the shown slices, in percent
    pub percent: f64,
}

/// Chart data series
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Chart {
    Histogram {
        title: String,
        column: String,
        bins: Vec<HistogramBin>,
    },
    Distribution {
        title: String,
        column: String,
        slices: Vec<CategoryCount>,
    },
}

/// Numeric insights about a cleaned table
#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    pub rows: usize,
    pub columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_matrix: Option<CorrelationMatrix>,
    pub descriptive_statistics: Vec<ColumnSummary>,
    /// Held-out score of the model trained on this table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_score: Option<f64>,
}

/// Compute insights and chart data for a cleaned table
pub fn analyze(table: &CleanTable) -> (Insights, Vec<Chart>) {
    let numeric: Vec<(&str, &[f64])> = table.numeric_columns().collect();

    let correlation_matrix = (numeric.len() > 1).then(|| correlation_matrix(&numeric));

    let descriptive_statistics = table
        .columns()
        .iter()
        .map(|c| match &c.data {
            ColumnData::Numeric(values) => ColumnSummary::numeric(&c.name, values),
            ColumnData::Categorical(values) => ColumnSummary::categorical(&c.name, values),
        })
        .collect();

    let mut charts = Vec::new();
    if let Some((name, values)) = numeric.first() {
        charts.push(Chart::Histogram {
            title: format!("Histogram of {}", name),
            column: name.to_string(),
            bins: histogram(values, HISTOGRAM_BINS),
        });
    }
    if let Some((name, values)) = table.categorical_columns().next() {
        charts.push(Chart::Distribution {
            title: format!("Distribution of {}", name),
            column: name.to_string(),
            slices: top_categories(values, TOP_CATEGORIES),
        });
    }

    let insights = Insights {
        rows: table.height(),
        columns: table.width(),
        correlation_matrix,
        descriptive_statistics,
        model_score: None,
    };
    (insights, charts)
}

/// Describe every column of an uncleaned table.
///
/// A column is summarized numerically only when all of its present cells are numbers.
pub fn describe(table: &RawTable) -> Vec<ColumnSummary> {
    table
        .columns()
        .iter()
        .map(|c| {
            let present: Vec<&Scalar> = c.values.iter().filter(|v| !v.is_missing()).collect();
            let numbers: Option<Vec<f64>> = present
                .iter()
                .map(|v| match v {
                    Scalar::Number(x) => Some(*x),
                    _ => None,
                })
                .collect();
            match numbers {
                Some(values) if !values.is_empty() => ColumnSummary::numeric(&c.name, &values),
                _ => ColumnSummary::categorical(&c.name, &c.values),
            }
        })
        .collect()
}

fn correlation_matrix(numeric: &[(&str, &[f64])]) -> CorrelationMatrix {
    let n = numeric.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        values[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let r = stats::pearson(numeric[i].1, numeric[j].1);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    CorrelationMatrix {
        columns: numeric.iter().map(|(name, _)| name.to_string()).collect(),
        values,
    }
}

/// Equal-width bins over `[min, max]`, right-closed, with the lowest edge
/// pushed down by 0.1% of the range so the minimum falls inside the first bin
pub fn histogram(values: &[f64], n_bins: usize) -> Vec<HistogramBin> {
    let (Some(&min), Some(&max)) = (
        values.iter().min_by(|a, b| a.total_cmp(b)),
        values.iter().max_by(|a, b| a.total_cmp(b)),
    ) else {
        return Vec::new();
    };
    let n_bins = n_bins.max(1);

    let (lo, hi) = if min == max {
        let pad = if min == 0.0 { 0.001 } else { min.abs() * 0.001 };
        (min - pad, max + pad)
    } else {
        (min, max)
    };
    let width = (hi - lo) / n_bins as f64;
    let mut edges: Vec<f64> = (0..n_bins).map(|i| lo + width * i as f64).collect();
    edges.push(hi);
    if min != max {
        edges[0] -= (max - min) * 0.001;
    }

    let mut counts = vec![0usize; n_bins];
    for &v in values {
        let idx = edges[1..].iter().position(|&upper| v <= upper).unwrap_or(n_bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            label: format!("({:.3}, {:.3}]", edges[i], edges[i + 1]),
            lower: edges[i],
            upper: edges[i + 1],
            count,
        })
        .collect()
}

fn top_categories(values: &[Scalar], k: usize) -> Vec<CategoryCount> {
    let counts: Vec<(Scalar, usize)> = stats::value_counts(values).into_iter().take(k).collect();
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    counts
        .into_iter()
        .map(|(value, count)| CategoryCount {
            value: value.to_json(),
            count,
            percent: if total > 0 { count as f64 * 100.0 / total as f64 } else { 0.0 },
        })
        .collect()
}
