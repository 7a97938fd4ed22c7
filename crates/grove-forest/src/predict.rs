//! Voting and prediction for the forest ensemble.

use crate::error::ForestError;
use crate::forest::RandomForest;

/// Offset keeping the tree weight finite when validation reaches 1.0.
const ERROR_EPSILON: f64 = 1.0001;

/// Class probability distribution from a vote.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Return the predicted class. Ties go to the lowest class index.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        arg_max(&self.probs)
    }

    /// Return the top-k classes sorted by descending probability.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<(usize, f64)> {
        let mut indexed: Vec<(usize, f64)> = self.probs.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
        indexed.truncate(k);
        indexed
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

fn arg_max(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Log-odds weight of a tree, `0.5 * ln((classes - 1)(1 - e) / e)` with
/// `e = 1.0001 - validation`.
fn tree_weight(validation: f64, n_classes: usize) -> f64 {
    let e = ERROR_EPSILON - validation;
    0.5 * (((n_classes as f64 - 1.0) * (1.0 - e)) / e).ln()
}

/// Add `weight * vote` into `acc`. Votes from trees built before later
/// classes appeared are shorter and contribute nothing to those classes.
fn accumulate(acc: &mut [f64], vote: &[f64], weight: f64) {
    for (total, &p) in acc.iter_mut().zip(vote) {
        *total += weight * p;
    }
}

impl RandomForest {
    fn check_prediction_row(&self, row: &[f64]) -> Result<(), ForestError> {
        if self.trees.is_empty() {
            return Err(ForestError::EmptyForest);
        }
        let expected = self.n_features();
        if row.len() != expected {
            return Err(ForestError::PredictionFeatureMismatch {
                expected,
                got: row.len(),
            });
        }
        Ok(())
    }

    fn vote_unchecked(&self, row: &[f64]) -> Vec<f64> {
        let mut acc = vec![0.0f64; self.n_classes()];
        for tree in &self.trees {
            accumulate(&mut acc, tree.distribution_of(row), 1.0);
        }
        let n = self.trees.len() as f64;
        acc.iter_mut().for_each(|v| *v /= n);
        acc
    }

    /// Unweighted mean of every tree's leaf distribution for `row`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyForest`] | the forest has no trees |
    /// | [`ForestError::PredictionFeatureMismatch`] | `row` has the wrong width |
    pub fn vote(&self, row: &[f64]) -> Result<ClassDistribution, ForestError> {
        self.check_prediction_row(row)?;
        Ok(ClassDistribution::new(self.vote_unchecked(row)))
    }

    /// Validation-weighted mean of every tree's leaf distribution for `row`.
    ///
    /// Trees whose weight is not positive, including those with undefined
    /// validation, are left out of both the sum and the normalizer.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyForest`] | the forest has no trees |
    /// | [`ForestError::PredictionFeatureMismatch`] | `row` has the wrong width |
    /// | [`ForestError::ZeroTotalWeight`] | no tree has a positive weight |
    pub fn weight_vote(&self, row: &[f64]) -> Result<ClassDistribution, ForestError> {
        self.check_prediction_row(row)?;
        let n_classes = self.n_classes();
        let mut acc = vec![0.0f64; n_classes];
        let mut total_weight = 0.0;
        for tree in &self.trees {
            let weight = tree_weight(tree.validation(), n_classes);
            if weight.is_nan() || weight <= 0.0 {
                continue;
            }
            accumulate(&mut acc, tree.distribution_of(row), weight);
            total_weight += weight;
        }
        if total_weight <= 0.0 {
            return Err(ForestError::ZeroTotalWeight);
        }
        acc.iter_mut().for_each(|v| *v /= total_weight);
        Ok(ClassDistribution::new(acc))
    }

    /// Predict the class of a single row.
    ///
    /// # Errors
    ///
    /// Same as [`RandomForest::vote`].
    pub fn predict_one(&self, row: &[f64]) -> Result<usize, ForestError> {
        Ok(self.vote(row)?.predicted_class())
    }

    /// Predict one label per row, evaluating rows on the worker pool.
    ///
    /// Every row is checked before any voting starts.
    ///
    /// # Errors
    ///
    /// Same as [`RandomForest::vote`], for the first offending row.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>, ForestError> {
        for row in rows {
            self.check_prediction_row(row)?;
        }
        Ok(self
            .pool
            .run(rows.len(), |i| arg_max(&self.vote_unchecked(&rows[i]))))
    }
}
