//! Isolation depth scoring of the training rows.

use tracing::{debug, instrument};

use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::stats::{mean, variance};

/// Per-row mean leaf depth across the ensemble.
///
/// Rows with depth well below `mean` separate from the bulk of the data in
/// few splits and are candidate outliers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IsolationScores {
    /// Mean leaf depth of each training row, in dataset order.
    pub depths: Vec<f64>,
    /// Mean of `depths`.
    pub mean: f64,
    /// Population standard deviation of `depths`.
    pub std_dev: f64,
}

impl IsolationScores {
    /// Indices of rows at least `k` standard deviations shallower than the mean.
    #[must_use]
    pub fn outliers(&self, k: f64) -> Vec<usize> {
        let cutoff = self.mean - k * self.std_dev;
        self.depths
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d < cutoff)
            .map(|(i, _)| i)
            .collect()
    }
}

impl RandomForest {
    /// Score every training row by its mean leaf depth across all trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::EmptyForest`] when the forest has no trees.
    #[instrument(skip_all, fields(n_rows = self.dataset.len(), n_trees = self.trees.len()))]
    pub fn isolation_forest(&self) -> Result<IsolationScores, ForestError> {
        if self.trees.is_empty() {
            return Err(ForestError::EmptyForest);
        }
        let n_trees = self.trees.len() as f64;
        let dataset = &self.dataset;
        let trees = &self.trees;

        let depths = self.pool.run(dataset.len(), |i| {
            let row = dataset.row(i);
            let total: usize = trees.iter().map(|t| t.descend(row).depth()).sum();
            total as f64 / n_trees
        });

        let mean = mean(&depths);
        let std_dev = variance(&depths, mean).sqrt();
        debug!(mean, std_dev, "isolation depths computed");
        Ok(IsolationScores {
            depths,
            mean,
            std_dev,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ForestConfig;
    use crate::dataset::Dataset;
    use crate::error::ForestError;
    use crate::forest::RandomForest;

    /// 40 clustered rows whose labels are mixed at every value, plus one
    /// distant row of its own class at index 40.
    fn cluster_with_outlier() -> Dataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40_usize {
            let x = (i % 10) as f64 * 0.01;
            rows.push(vec![x, 1.0 - x]);
            labels.push((i / 10) % 2);
        }
        rows.push(vec![100.0, -100.0]);
        labels.push(2);
        Dataset::new(rows, labels).unwrap()
    }

    #[test]
    fn one_score_per_training_row() {
        let forest = ForestConfig::new().fit(cluster_with_outlier(), 10).unwrap();
        let scores = forest.isolation_forest().unwrap();
        assert_eq!(scores.depths.len(), 41);
        assert!(scores.depths.iter().all(|&d| d >= 1.0));
        assert!(scores.std_dev >= 0.0);
        let expected_mean = scores.depths.iter().sum::<f64>() / 41.0;
        assert!((scores.mean - expected_mean).abs() < 1e-12);
    }

    #[test]
    fn single_leaf_trees_score_one() {
        let dataset = Dataset::new(vec![vec![1.0], vec![2.0], vec![3.0]], vec![0, 0, 0]).unwrap();
        let forest = ForestConfig::new().fit(dataset, 4).unwrap();
        let scores = forest.isolation_forest().unwrap();
        assert_eq!(scores.depths, vec![1.0, 1.0, 1.0]);
        assert_eq!(scores.std_dev, 0.0);
        assert!(scores.outliers(1.0).is_empty());
    }

    #[test]
    fn distant_row_scores_as_outlier() {
        let forest = ForestConfig::new().fit(cluster_with_outlier(), 10).unwrap();
        let scores = forest.isolation_forest().unwrap();
        assert!(
            scores.depths[40] < scores.mean,
            "outlier depth {} >= mean {}",
            scores.depths[40],
            scores.mean
        );
        assert!(scores.outliers(1.0).contains(&40));
    }

    #[test]
    fn untrained_forest_has_no_scores() {
        let forest = RandomForest::new(ForestConfig::new(), cluster_with_outlier()).unwrap();
        assert!(matches!(forest.isolation_forest(), Err(ForestError::EmptyForest)));
    }

    #[test]
    fn outliers_below_cutoff() {
        let scores = super::IsolationScores {
            depths: vec![3.0, 3.0, 3.0, 0.0],
            mean: 2.25,
            std_dev: 1.299,
        };
        assert_eq!(scores.outliers(1.0), vec![3]);
    }
}
