//! Accuracy and out-of-bag validation summaries.

use tracing::info;

use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::stats::{mean, quantile, variance};

/// Fraction of `predictions` equal to the matching entry of `labels`.
///
/// Returns NaN for empty input.
///
/// # Errors
///
/// Returns [`ForestError::LengthMismatch`] when the slices differ in length.
pub fn accuracy(predictions: &[usize], labels: &[usize]) -> Result<f64, ForestError> {
    if predictions.len() != labels.len() {
        return Err(ForestError::LengthMismatch {
            predictions: predictions.len(),
            labels: labels.len(),
        });
    }
    if predictions.is_empty() {
        return Ok(f64::NAN);
    }
    let correct = predictions
        .iter()
        .zip(labels)
        .filter(|(p, l)| p == l)
        .count();
    Ok(correct as f64 / predictions.len() as f64)
}

/// Distribution of per-tree out-of-bag validation scores.
///
/// Statistics cover only trees with a defined score; `n_undefined` counts
/// the rest. Every statistic is NaN when no tree has a defined score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationSummary {
    /// Total number of trees.
    pub n_trees: usize,
    /// Trees whose bootstrap left no out-of-bag rows.
    pub n_undefined: usize,
    /// Mean validation score.
    pub mean: f64,
    /// Median validation score.
    pub median: f64,
    /// Population variance of the validation scores.
    pub variance: f64,
    /// Population standard deviation of the validation scores.
    pub std_dev: f64,
    /// Lowest validation score.
    pub worst: f64,
    /// Highest validation score.
    pub best: f64,
}

impl RandomForest {
    /// Summarize the out-of-bag validation scores of the current trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::EmptyForest`] when the forest has no trees.
    pub fn validation_summary(&self) -> Result<ValidationSummary, ForestError> {
        if self.trees.is_empty() {
            return Err(ForestError::EmptyForest);
        }
        let scores: Vec<f64> = self
            .trees
            .iter()
            .map(|t| t.validation())
            .filter(|v| !v.is_nan())
            .collect();

        let mean = mean(&scores);
        let variance = variance(&scores, mean);
        let (worst, best) = if scores.is_empty() {
            (f64::NAN, f64::NAN)
        } else {
            scores
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                })
        };

        let summary = ValidationSummary {
            n_trees: self.trees.len(),
            n_undefined: self.trees.len() - scores.len(),
            mean,
            median: quantile(&scores, 0.5)?,
            variance,
            std_dev: variance.sqrt(),
            worst,
            best,
        };
        info!(
            n_trees = summary.n_trees,
            n_undefined = summary.n_undefined,
            mean = summary.mean,
            median = summary.median,
            std_dev = summary.std_dev,
            worst = summary.worst,
            best = summary.best,
            "validation summary"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForestConfig;
    use crate::dataset::Dataset;

    #[test]
    fn accuracy_counts_matches() {
        assert_eq!(accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]).unwrap(), 0.75);
        assert_eq!(accuracy(&[2, 2], &[2, 2]).unwrap(), 1.0);
    }

    #[test]
    fn accuracy_empty_is_nan() {
        assert!(accuracy(&[], &[]).unwrap().is_nan());
    }

    #[test]
    fn accuracy_length_mismatch() {
        let err = accuracy(&[0, 1], &[0]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::LengthMismatch { predictions: 2, labels: 1 }
        ));
    }

    fn separable() -> Dataset {
        let rows = (0..40_i32).map(|i| vec![f64::from(i)]).collect();
        let labels = (0..40_i32).map(|i| usize::from(i >= 20)).collect();
        Dataset::new(rows, labels).unwrap()
    }

    #[test]
    fn summary_orders_statistics() {
        let forest = ForestConfig::new().fit(separable(), 12).unwrap();
        let summary = forest.validation_summary().unwrap();
        assert_eq!(summary.n_trees, 12);
        assert_eq!(summary.n_undefined, 0);
        assert!(summary.worst <= summary.median && summary.median <= summary.best);
        assert!(summary.worst <= summary.mean && summary.mean <= summary.best);
        assert!((summary.std_dev * summary.std_dev - summary.variance).abs() < 1e-12);
    }

    #[test]
    fn summary_with_no_defined_scores() {
        let dataset = Dataset::new(vec![vec![0.0]], vec![0]).unwrap();
        let forest = ForestConfig::new().fit(dataset, 3).unwrap();
        let summary = forest.validation_summary().unwrap();
        assert_eq!(summary.n_undefined, 3);
        assert!(summary.mean.is_nan());
        assert!(summary.median.is_nan());
        assert!(summary.best.is_nan());
    }

    #[test]
    fn summary_requires_trees() {
        let forest = RandomForest::new(ForestConfig::new(), separable()).unwrap();
        assert!(matches!(forest.validation_summary(), Err(ForestError::EmptyForest)));
    }
}
