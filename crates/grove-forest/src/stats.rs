//! Impurity and summary statistics.

use crate::error::ForestError;

/// Gini impurity of a class-count histogram: `1 - Σ(count_i / total)²`.
///
/// An empty histogram (total of zero) is treated as maximally impure and
/// returns `1.0`. Such a histogram only arises for an empty partition, which
/// the split finder never evaluates.
#[must_use]
pub fn gini(class_counts: &[usize]) -> f64 {
    let total: usize = class_counts.iter().sum();
    if total == 0 {
        return 1.0;
    }
    let n = total as f64;
    let sum_sq: f64 = class_counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum();
    1.0 - sum_sq
}

/// Arithmetic mean. NaN for an empty slice.
#[must_use]
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population variance (divides by N) around a precomputed `mean`.
/// NaN for an empty slice.
#[must_use]
pub fn variance(data: &[f64], mean: f64) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let sum_sq: f64 = data
        .iter()
        .map(|&v| {
            let diff = v - mean;
            diff * diff
        })
        .sum();
    sum_sq / data.len() as f64
}

/// Population standard deviation.
#[must_use]
pub fn std_dev(data: &[f64]) -> f64 {
    variance(data, mean(data)).sqrt()
}

/// Quantile `q` of `data` by linear interpolation between the two order
/// statistics bracketing position `q * (N - 1)`.
///
/// The input is not modified; a sorted copy is used. Returns NaN for an
/// empty slice.
///
/// # Errors
///
/// Returns [`ForestError::InvalidQuantile`] when `q` is outside `[0, 1]`.
pub fn quantile(data: &[f64], q: f64) -> Result<f64, ForestError> {
    if !(0.0..=1.0).contains(&q) {
        return Err(ForestError::InvalidQuantile { q });
    }
    if data.is_empty() {
        return Ok(f64::NAN);
    }

    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let weight = pos - lower as f64;
    match sorted.get(lower + 1) {
        Some(&upper) => Ok(sorted[lower] * (1.0 - weight) + upper * weight),
        None => Ok(sorted[lower]),
    }
}
