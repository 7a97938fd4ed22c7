//! Random forest training with bounded parallel tree construction and
//! incremental (continuous) updates.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument, warn};

use crate::config::{ForestConfig, ForestParams};
use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::importance::{RankedFeature, aggregate_importances, rank_importances};
use crate::pool::WorkerPool;
use crate::stats::mean;
use crate::tree::{DecisionTree, TreeParams};

/// A random forest that owns its dataset and its trees.
///
/// Trees are kept in slot order: a batch of `n` trees occupies `n`
/// consecutive slots at the end of the collection, and the tree built for
/// slot `i` always lands at slot `i` however the workers interleave.
#[derive(Debug)]
pub struct RandomForest {
    pub(crate) config: ForestConfig,
    pub(crate) dataset: Dataset,
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) params: Option<ForestParams>,
    pub(crate) feature_importance: Vec<f64>,
    pub(crate) pool: WorkerPool,
    rng: ChaCha8Rng,
}

/// Generate a bootstrap sample of `n_samples` draws and the out-of-bag indices.
fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> (Vec<usize>, Vec<usize>) {
    let mut in_bag = vec![false; n_samples];
    let mut bootstrap_indices = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let idx = rng.gen_range(0..n_samples);
        bootstrap_indices.push(idx);
        in_bag[idx] = true;
    }
    let oob_indices: Vec<usize> = (0..n_samples).filter(|&i| !in_bag[i]).collect();
    (bootstrap_indices, oob_indices)
}

/// Mean probability the tree assigns to the true label of each out-of-bag row.
///
/// NaN when the bootstrap drew every row.
fn out_of_bag_validation(tree: &DecisionTree, dataset: &Dataset, oob_indices: &[usize]) -> f64 {
    if oob_indices.is_empty() {
        return f64::NAN;
    }
    let total: f64 = oob_indices
        .iter()
        .map(|&i| {
            let vote = tree.distribution_of(dataset.row(i));
            vote.get(dataset.label(i)).copied().unwrap_or(0.0)
        })
        .sum();
    total / oob_indices.len() as f64
}

/// Build one tree from its own bootstrap sample and score it out-of-bag.
fn grow_tree(dataset: &Dataset, params: &TreeParams, seed: u64) -> DecisionTree {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (bootstrap_indices, oob_indices) = bootstrap_sample(dataset.len(), &mut rng);
    let mut tree = DecisionTree::grow(dataset, &bootstrap_indices, params, &mut rng);
    tree.validation = out_of_bag_validation(&tree, dataset, &oob_indices);
    tree
}

impl RandomForest {
    /// Create an untrained forest over `dataset`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::InvalidMaxFeatures`] | explicit `m_features` exceeds the row width |
    /// | [`ForestError::WorkerPool`] | the worker pool cannot be created |
    pub fn new(config: ForestConfig, dataset: Dataset) -> Result<Self, ForestError> {
        if let Some(m_features) = config.m_features
            && m_features > dataset.n_features()
        {
            return Err(ForestError::InvalidMaxFeatures {
                m_features,
                n_features: dataset.n_features(),
            });
        }
        let pool = WorkerPool::new(config.n_workers)?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            feature_importance: vec![0.0; dataset.n_features()],
            config,
            dataset,
            trees: Vec::new(),
            params: None,
            pool,
            rng,
        })
    }

    /// Train `n_trees` trees from scratch, replacing any existing ensemble.
    ///
    /// Each tree is built from its own bootstrap sample on the worker pool;
    /// importance is aggregated after every tree has been published.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::InvalidTreeCount`] | `n_trees` is zero |
    /// | [`ForestError::InvalidMaxFeatures`] | `m_features` exceeds the row width |
    #[instrument(skip_all, fields(n_trees = n_trees, n_samples = self.dataset.len()))]
    pub fn train(&mut self, n_trees: usize) -> Result<(), ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        let params = self.resolve_params()?;

        info!(
            n_trees,
            n_samples = params.n_samples,
            n_features = params.n_features,
            n_classes = params.n_classes,
            m_features = params.m_features,
            leaf_size = params.leaf_size,
            max_depth = params.max_depth,
            n_workers = self.pool.n_workers(),
            "training random forest"
        );

        self.trees = self.build_trees(n_trees, &params);
        self.refresh_importance();

        info!(
            mean_validation = self.mean_validation(),
            "random forest training complete"
        );
        Ok(())
    }

    /// Append one row and grow `new_trees` additional trees.
    ///
    /// When the configured `max_rows` is exceeded the oldest rows are evicted;
    /// when `max_trees` is exceeded the oldest trees are dropped. Existing
    /// trees are never rebuilt, so the ensemble mixes trees trained on
    /// different windows of the stream.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::FeatureCountMismatch`] | `row` has the wrong width |
    /// | [`ForestError::NonFiniteValue`] | `row` has a NaN or infinite value |
    #[instrument(skip(self, row), fields(n_rows = self.dataset.len()))]
    pub fn add_data_row(
        &mut self,
        row: Vec<f64>,
        label: usize,
        new_trees: usize,
    ) -> Result<(), ForestError> {
        self.dataset.push(row, label)?;
        if let Some(max_rows) = self.config.max_rows {
            let evicted = self.dataset.evict_to(max_rows);
            if evicted > 0 {
                debug!(evicted, n_rows = self.dataset.len(), "evicted oldest rows");
            }
        }

        let params = self.resolve_params()?;
        if new_trees > 0 {
            let fresh = self.build_trees(new_trees, &params);
            self.trees.extend(fresh);
        }

        if let Some(max_trees) = self.config.max_trees {
            let excess = self.trees.len().saturating_sub(max_trees);
            if excess > 0 {
                self.trees.drain(..excess);
                debug!(dropped = excess, n_trees = self.trees.len(), "dropped oldest trees");
            }
        }

        self.refresh_importance();
        Ok(())
    }

    fn resolve_params(&mut self) -> Result<ForestParams, ForestError> {
        let params = ForestParams::resolve(&self.config, &self.dataset, self.params.as_ref())?;
        self.params = Some(params);
        Ok(params)
    }

    /// Build a batch of trees into freshly reserved slots.
    ///
    /// Per-slot seeds are drawn from the forest generator before dispatch so
    /// the batch does not depend on the worker count or scheduling.
    fn build_trees(&mut self, n_trees: usize, params: &ForestParams) -> Vec<DecisionTree> {
        let seeds: Vec<u64> = (0..n_trees).map(|_| self.rng.r#gen()).collect();
        let tree_params = params.tree_params();
        let dataset = &self.dataset;

        self.pool.run(n_trees, |slot| {
            let tree = grow_tree(dataset, &tree_params, seeds[slot]);
            debug!(
                slot,
                n_nodes = tree.n_nodes(),
                depth = tree.depth(),
                validation = tree.validation(),
                "tree built"
            );
            if tree.validation().is_nan() {
                warn!(slot, "bootstrap covered every row; validation score undefined");
            }
            tree
        })
    }

    fn refresh_importance(&mut self) {
        self.feature_importance = aggregate_importances(&self.trees, self.dataset.n_features());
    }

    fn mean_validation(&self) -> f64 {
        let defined: Vec<f64> = self
            .trees
            .iter()
            .map(DecisionTree::validation)
            .filter(|v| !v.is_nan())
            .collect();
        mean(&defined)
    }

    // --- Getters ---

    /// Return the configuration.
    #[must_use]
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Borrow the dataset.
    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Borrow the trees, oldest first.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the row width.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.dataset.n_features()
    }

    /// Return the class count: `1 + max(label)` over every row the forest
    /// has trained on. Evicting rows never lowers it.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.params
            .map_or_else(|| self.dataset.n_classes(), |p| p.n_classes)
    }

    /// Return the parameters resolved by the last training call, if any.
    #[must_use]
    pub fn params(&self) -> Option<&ForestParams> {
        self.params.as_ref()
    }

    /// Return the resolved worker count.
    #[must_use]
    pub fn n_workers(&self) -> usize {
        self.pool.n_workers()
    }

    /// Return per-feature importance, normalized to sum to 1.0 once any tree has split.
    #[must_use]
    pub fn feature_importance(&self) -> &[f64] {
        &self.feature_importance
    }

    /// Return features ranked by importance, most important first.
    #[must_use]
    pub fn ranked_importances(&self) -> Vec<RankedFeature> {
        rank_importances(&self.feature_importance)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    /// Generate a simple 3-class separable dataset.
    fn make_separable_data() -> Dataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for (class, offset) in [(0, 0.0), (1, 10.0), (2, 20.0)] {
            for i in 0..20_i32 {
                rows.push(vec![offset + f64::from(i) * 0.15, 0.5]);
                labels.push(class);
            }
        }
        Dataset::new(rows, labels).unwrap()
    }

    fn tree_fingerprints(trees: &[DecisionTree]) -> Vec<String> {
        trees.iter().map(|t| format!("{:?}", t.nodes())).collect()
    }

    #[test]
    fn bootstrap_partitions_rows() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (bag, oob) = bootstrap_sample(50, &mut rng);
        assert_eq!(bag.len(), 50);
        for i in 0..50 {
            assert_ne!(bag.contains(&i), oob.contains(&i), "row {i}");
        }
    }

    #[test]
    fn separable_training_accuracy() {
        let config = ForestConfig::new().with_m_features(2).with_leaf_size(1);
        let forest = config.fit(make_separable_data(), 30).unwrap();
        assert_eq!(forest.n_trees(), 30);

        let rows: Vec<Vec<f64>> = forest.dataset().rows().map(<[f64]>::to_vec).collect();
        let labels: Vec<usize> = forest.dataset().labels().collect();
        let predictions = forest.predict(&rows).unwrap();
        let accuracy = crate::accuracy(&predictions, &labels).unwrap();
        assert!(accuracy > 0.95, "accuracy = {accuracy}");
    }

    #[test]
    fn validation_scores_are_probabilities() {
        let forest = ForestConfig::new().fit(make_separable_data(), 20).unwrap();
        for tree in forest.trees() {
            let v = tree.validation();
            assert!((0.0..=1.0).contains(&v), "validation = {v}");
        }
    }

    #[test]
    fn feature_importances_sum_to_one() {
        let forest = ForestConfig::new().fit(make_separable_data(), 20).unwrap();
        let importance = forest.feature_importance();
        assert!(importance.iter().all(|&v| v >= 0.0));
        let total: f64 = importance.iter().sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
        assert_eq!(forest.ranked_importances()[0].feature.index(), 0);
    }

    #[test]
    fn identical_across_worker_counts() {
        let sequential = ForestConfig::new()
            .with_seed(99)
            .with_n_workers(1)
            .fit(make_separable_data(), 12)
            .unwrap();
        let parallel = ForestConfig::new()
            .with_seed(99)
            .with_n_workers(4)
            .fit(make_separable_data(), 12)
            .unwrap();
        assert_eq!(
            tree_fingerprints(sequential.trees()),
            tree_fingerprints(parallel.trees())
        );
        assert_eq!(sequential.feature_importance(), parallel.feature_importance());
    }

    #[test]
    fn different_seeds_differ() {
        let a = ForestConfig::new().with_seed(1).fit(make_separable_data(), 8).unwrap();
        let b = ForestConfig::new().with_seed(2).fit(make_separable_data(), 8).unwrap();
        assert_ne!(tree_fingerprints(a.trees()), tree_fingerprints(b.trees()));
    }

    #[test]
    fn retrain_replaces_ensemble() {
        let mut forest = ForestConfig::new().fit(make_separable_data(), 10).unwrap();
        forest.train(4).unwrap();
        assert_eq!(forest.n_trees(), 4);
    }

    #[test]
    fn invalid_tree_count_error() {
        let mut forest = RandomForest::new(ForestConfig::new(), make_separable_data()).unwrap();
        let err = forest.train(0).unwrap_err();
        assert!(matches!(err, ForestError::InvalidTreeCount { n_trees: 0 }));
        assert!(forest.params().is_none());
    }

    #[test]
    fn oversized_m_features_rejected_up_front() {
        let err = RandomForest::new(ForestConfig::new().with_m_features(3), make_separable_data())
            .unwrap_err();
        assert!(matches!(err, ForestError::InvalidMaxFeatures { .. }));
    }

    #[test]
    fn single_row_has_undefined_validation() {
        let dataset = Dataset::new(vec![vec![1.0, 2.0]], vec![0]).unwrap();
        let forest = ForestConfig::new().fit(dataset, 3).unwrap();
        assert!(forest.trees().iter().all(|t| t.validation().is_nan()));
    }

    #[test]
    fn add_data_row_evicts_oldest_row() {
        let dataset = Dataset::new(vec![vec![0.0], vec![1.0], vec![2.0]], vec![0, 0, 1]).unwrap();
        let mut forest = RandomForest::new(ForestConfig::new().with_max_rows(3), dataset).unwrap();
        forest.add_data_row(vec![3.0], 1, 1).unwrap();
        assert_eq!(forest.dataset().len(), 3);
        let rows: Vec<&[f64]> = forest.dataset().rows().collect();
        assert_eq!(rows, vec![&[1.0][..], &[2.0][..], &[3.0][..]]);
        assert_eq!(forest.n_trees(), 1);
    }

    #[test]
    fn add_data_row_keeps_most_recent_trees() {
        let config = ForestConfig::new().with_max_trees(4).with_seed(5);
        let mut forest = config.fit(make_separable_data(), 3).unwrap();
        let before = tree_fingerprints(forest.trees());

        forest.add_data_row(vec![1.0, 0.5], 0, 2).unwrap();
        assert_eq!(forest.n_trees(), 4);
        let after = tree_fingerprints(forest.trees());
        assert_eq!(&after[..2], &before[1..]);
    }

    #[test]
    fn add_data_row_without_new_trees() {
        let mut forest = ForestConfig::new().fit(make_separable_data(), 3).unwrap();
        forest.add_data_row(vec![30.0, 0.5], 3, 0).unwrap();
        assert_eq!(forest.n_trees(), 3);
        assert_eq!(forest.dataset().len(), 61);
        assert_eq!(forest.params().map(|p| p.n_classes), Some(4));
    }

    #[test]
    fn add_data_row_rejects_bad_row() {
        let mut forest = ForestConfig::new().fit(make_separable_data(), 2).unwrap();
        let err = forest.add_data_row(vec![1.0], 0, 1).unwrap_err();
        assert!(matches!(err, ForestError::FeatureCountMismatch { .. }));
        assert_eq!(forest.dataset().len(), 60);
        assert_eq!(forest.n_trees(), 2);
    }

    #[test]
    fn add_data_row_on_untrained_forest() {
        let mut forest = RandomForest::new(ForestConfig::new(), make_separable_data()).unwrap();
        forest.add_data_row(vec![2.0, 0.5], 0, 2).unwrap();
        assert_eq!(forest.n_trees(), 2);
        assert!(forest.params().is_some());
    }
}
