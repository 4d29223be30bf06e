//! Evaluation metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics for model evaluation on the held-out rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy (classification)
    pub accuracy: Option<f64>,
    /// Mean Squared Error (regression)
    pub mse: Option<f64>,
    /// Root Mean Squared Error (regression)
    pub rmse: Option<f64>,
    /// Mean Absolute Error (regression)
    pub mae: Option<f64>,
    /// R-squared (regression)
    pub r2: Option<f64>,
    /// Training time in seconds
    pub training_time_secs: f64,
    /// Number of features
    pub n_features: usize,
    /// Number of scored samples
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute classification metrics from encoded labels
    pub fn compute_classification(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut metrics = Self::new();
        metrics.n_samples = y_true.len();

        if !y_true.is_empty() {
            let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
            metrics.accuracy = Some(correct as f64 / y_true.len() as f64);
        }
        metrics
    }

    /// Compute regression metrics
    pub fn compute_regression(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut metrics = Self::new();
        metrics.n_samples = y_true.len();
        if y_true.is_empty() {
            return metrics;
        }

        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true.iter().zip(y_pred.iter()).map(|(t, p)| t - p).collect();

        let mse: f64 = errors.iter().map(|e| e * e).sum::<f64>() / n;
        metrics.mse = Some(mse);
        metrics.rmse = Some(mse.sqrt());
        metrics.mae = Some(errors.iter().map(|e| e.abs()).sum::<f64>() / n);

        // R² is 0 when the held-out target has no variance
        let y_mean: f64 = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();
        metrics.r2 = Some(if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 });

        metrics
    }

    /// Headline score: R² for regression, accuracy for classification
    pub fn score(&self) -> f64 {
        self.r2.or(self.accuracy).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let y_true = array![1.0, 2.0, 3.0, 4.0];
        let y_pred = array![1.0, 2.0, 3.0, 5.0];
        let metrics = ModelMetrics::compute_regression(&y_true, &y_pred);

        assert_eq!(metrics.mse, Some(0.25));
        assert_eq!(metrics.mae, Some(0.25));
        assert!((metrics.r2.unwrap() - 0.8).abs() < 1e-12);
        assert_eq!(metrics.score(), metrics.r2.unwrap());
    }

    #[test]
    fn test_r2_zero_variance() {
        let metrics = ModelMetrics::compute_regression(&array![3.0, 3.0], &array![2.0, 4.0]);
        assert_eq!(metrics.r2, Some(0.0));
    }

    #[test]
    fn test_accuracy() {
        let metrics = ModelMetrics::compute_classification(&array![0.0, 1.0, 2.0, 1.0], &array![0.0, 1.0, 1.0, 1.0]);
        assert_eq!(metrics.accuracy, Some(0.75));
        assert_eq!(metrics.score(), 0.75);
    }
}
