//! Recency-weighted and plain aggregate statistics
//!
//! Pure functions over ordered observations (oldest first).

use thiserror::Error;

/// Invalid input to an aggregate computation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("{values} values but {weights} weights")]
    LengthMismatch { values: usize, weights: usize },

    #[error("weights sum to zero")]
    ZeroWeightSum,

    #[error("{0} window is empty")]
    EmptyWindow(&'static str),
}

/// Normalized exponential recency weights for `n` observations.
///
/// Exponents are spaced evenly from `start` (oldest) to `end` (newest), so with the
/// default -2..0 range the oldest race counts about e^-2 as much as the latest.
pub fn exponential_weights(n: usize, start: f64, end: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![1.0];
    }

    let step = (end - start) / (n - 1) as f64;
    let raw: Vec<f64> = (0..n).map(|i| (start + step * i as f64).exp()).collect();
    let total: f64 = raw.iter().sum();

    raw.into_iter().map(|w| w / total).collect()
}

/// Weighted arithmetic mean
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Result<f64, AggregateError> {
    if values.len() != weights.len() {
        return Err(AggregateError::LengthMismatch {
            values: values.len(),
            weights: weights.len(),
        });
    }

    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        return Err(AggregateError::ZeroWeightSum);
    }

    let weighted: f64 = values.iter().zip(weights).map(|(v, w)| v * w).sum();
    Ok(weighted / total)
}

/// Arithmetic mean, NaN for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator), NaN below two observations
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// `count / total`, zero when there is nothing to divide by
pub fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}
