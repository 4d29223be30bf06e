//! Descriptive statistics over plain slices

use crate::table::{CellKey, Scalar};
use std::collections::HashMap;

/// Arithmetic mean, `None` for an empty slice
///
/// Finite inputs always give a finite mean: when the plain sum overflows,
/// each value is divided by `n` before summing.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let sum = values.iter().sum::<f64>();
    if sum.is_finite() {
        Some(sum / n)
    } else {
        Some(values.iter().map(|v| v / n).sum())
    }
}

/// Sample variance (n - 1 denominator), NaN for fewer than two values
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values).unwrap_or(0.0);
    let denom = (n - 1) as f64;
    let plain = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / denom;
    if plain.is_finite() {
        return plain;
    }

    // Deviations scaled by the largest one; inf only when the variance itself
    // is beyond f64 range
    let scale = values.iter().map(|v| (v / 2.0 - m / 2.0).abs()).fold(0.0, f64::max);
    if scale == 0.0 {
        return 0.0;
    }
    let scaled = values
        .iter()
        .map(|v| ((v / 2.0 - m / 2.0) / scale).powi(2))
        .sum::<f64>()
        / denom;
    scaled * scale * scale * 4.0
}

/// Sample standard deviation
pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Quantile with linear interpolation between closest ranks; `sorted` must be ascending
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Pearson correlation coefficient, `None` when either side has zero variance
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mx = x[..n].iter().sum::<f64>() / n as f64;
    let my = y[..n].iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx.sqrt() * syy.sqrt()))
}

/// Non-missing values ranked by frequency, ties broken by first occurrence
pub fn value_counts(values: &[Scalar]) -> Vec<(Scalar, usize)> {
    let mut counts: HashMap<CellKey<'_>, (usize, usize)> = HashMap::new();
    for (idx, v) in values.iter().enumerate() {
        if v.is_missing() {
            continue;
        }
        counts.entry(v.key()).or_insert((0, idx)).0 += 1;
    }
    let mut ranked: Vec<(usize, usize)> = counts.into_values().collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    ranked
        .into_iter()
        .map(|(count, first_idx)| (values[first_idx].clone(), count))
        .collect()
}

/// Most frequent non-missing value, ties broken by first occurrence
pub fn mode(values: &[Scalar]) -> Option<Scalar> {
    value_counts(values).into_iter().next().map(|(v, _)| v)
}

/// Number of distinct non-missing values
pub fn distinct_count(values: &[Scalar]) -> usize {
    values
        .iter()
        .filter(|v| !v.is_missing())
        .map(|v| v.key())
        .collect::<std::collections::HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        assert_eq!(mean(&[10.0, 30.0]), Some(20.0));
        assert_eq!(mean(&[]), None);
        assert!((sample_variance(&[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-12);
        assert!(sample_variance(&[5.0]).is_nan());
    }

    #[test]
    fn test_mean_of_huge_values_stays_finite() {
        let m = mean(&[1e308, 1.5e308]).unwrap();
        assert!(m.is_finite());
        assert!((m - 1.25e308).abs() < 1e294);

        let m = mean(&[f64::MAX, f64::MAX]).unwrap();
        assert!(m.is_finite());
    }

    #[test]
    fn test_variance_of_huge_values_is_not_nan() {
        let v = sample_variance(&[1e200, 3e200]);
        assert!(v.is_infinite());
        let v = sample_variance(&[1e150, 3e150]);
        assert!((v / 2e300 - 1.0).abs() < 1e-9);
        assert!(!sample_variance(&[f64::MAX, -f64::MAX]).is_nan());
    }

    #[test]
    fn test_quantile() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_pearson() {
        let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert!(pearson(&[1.0, 1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_mode_tie_breaks_on_first_occurrence() {
        let values = vec![
            Scalar::from("LA"),
            Scalar::from("NY"),
            Scalar::Missing,
            Scalar::from("NY"),
            Scalar::from("LA"),
        ];
        assert_eq!(mode(&values), Some(Scalar::from("LA")));
        assert_eq!(distinct_count(&values), 2);
        assert_eq!(mode(&[Scalar::Missing]), None);
    }
}
