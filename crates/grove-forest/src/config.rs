//! Configuration builder and lazily resolved forest parameters.

use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::tree::TreeParams;

const DEFAULT_MAX_DEPTH: usize = 10;
const MAX_DEFAULT_LEAF_SIZE: usize = 50;

/// Configuration for a random forest.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods. Every
/// numeric setter treats `0` as "unset", restoring the default.
///
/// # Defaults
///
/// | Parameter    | Default                          |
/// |--------------|----------------------------------|
/// | `m_features` | ⌊√n_features⌋, at least 1        |
/// | `leaf_size`  | `n_samples / 20`, clamped to [1, 50] |
/// | `max_depth`  | 10                               |
/// | `n_workers`  | all hardware threads             |
/// | `max_rows`   | unlimited                        |
/// | `max_trees`  | unlimited                        |
/// | `seed`       | 42                               |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForestConfig {
    pub(crate) m_features: Option<usize>,
    pub(crate) leaf_size: Option<usize>,
    pub(crate) max_depth: Option<usize>,
    pub(crate) n_workers: usize,
    pub(crate) max_rows: Option<usize>,
    pub(crate) max_trees: Option<usize>,
    pub(crate) seed: u64,
}

fn non_zero(value: usize) -> Option<usize> {
    (value > 0).then_some(value)
}

impl ForestConfig {
    /// Create a config with every parameter unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            m_features: None,
            leaf_size: None,
            max_depth: None,
            n_workers: 0,
            max_rows: None,
            max_trees: None,
            seed: 42,
        }
    }

    // --- Setters ---

    /// Set the number of candidate features drawn at each split.
    #[must_use]
    pub fn with_m_features(mut self, m_features: usize) -> Self {
        self.m_features = non_zero(m_features);
        self
    }

    /// Set the row count at or below which a node becomes a leaf.
    #[must_use]
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = non_zero(leaf_size);
        self
    }

    /// Set the depth at which nodes become leaves (the root is depth 1).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = non_zero(max_depth);
        self
    }

    /// Set the number of concurrent tree builders. `1` builds sequentially.
    #[must_use]
    pub fn with_n_workers(mut self, n_workers: usize) -> Self {
        self.n_workers = n_workers;
        self
    }

    /// Keep at most `max_rows` rows when streaming new data; older rows are evicted.
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = non_zero(max_rows);
        self
    }

    /// Keep at most `max_trees` trees when streaming new data; older trees are dropped.
    #[must_use]
    pub fn with_max_trees(mut self, max_trees: usize) -> Self {
        self.max_trees = non_zero(max_trees);
        self
    }

    /// Set the seed of the forest's random generator.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the configured candidate-feature count, if set.
    #[must_use]
    pub fn m_features(&self) -> Option<usize> {
        self.m_features
    }

    /// Return the configured leaf size, if set.
    #[must_use]
    pub fn leaf_size(&self) -> Option<usize> {
        self.leaf_size
    }

    /// Return the configured maximum depth, if set.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the configured worker count (`0` = all hardware threads).
    #[must_use]
    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    /// Return the row retention limit, if set.
    #[must_use]
    pub fn max_rows(&self) -> Option<usize> {
        self.max_rows
    }

    /// Return the tree retention limit, if set.
    #[must_use]
    pub fn max_trees(&self) -> Option<usize> {
        self.max_trees
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Create a forest over `dataset` and train `n_trees` trees.
    ///
    /// # Errors
    ///
    /// See [`RandomForest::new`] and [`RandomForest::train`].
    pub fn fit(&self, dataset: Dataset, n_trees: usize) -> Result<RandomForest, ForestError> {
        let mut forest = RandomForest::new(self.clone(), dataset)?;
        forest.train(n_trees)?;
        Ok(forest)
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters resolved from a [`ForestConfig`] against the current dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestParams {
    /// Row width.
    pub n_features: usize,
    /// `1 + max(label)`.
    pub n_classes: usize,
    /// Number of rows in the dataset.
    pub n_samples: usize,
    /// Candidate features drawn at each split.
    pub m_features: usize,
    /// Row count at or below which a node becomes a leaf.
    pub leaf_size: usize,
    /// Depth at which nodes become leaves.
    pub max_depth: usize,
}

impl ForestParams {
    /// Resolve parameters for `dataset`.
    ///
    /// Explicit configuration always wins. Otherwise a default resolved by
    /// an earlier call (`previous`) is kept, and only a forest that has never
    /// resolved computes fresh defaults. Dataset-derived sizes are always
    /// recomputed, except that `n_classes` never drops below its previous
    /// value: trees built before an eviction still vote over those classes.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMaxFeatures`] when `m_features` exceeds
    /// the row width.
    pub(crate) fn resolve(
        config: &ForestConfig,
        dataset: &Dataset,
        previous: Option<&ForestParams>,
    ) -> Result<Self, ForestError> {
        let n_features = dataset.n_features();
        let n_samples = dataset.len();

        let m_features = config
            .m_features
            .or(previous.map(|p| p.m_features))
            .unwrap_or_else(|| ((n_features as f64).sqrt() as usize).max(1));
        if m_features > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                m_features,
                n_features,
            });
        }

        let leaf_size = config
            .leaf_size
            .or(previous.map(|p| p.leaf_size))
            .unwrap_or_else(|| (n_samples / 20).clamp(1, MAX_DEFAULT_LEAF_SIZE));
        let max_depth = config
            .max_depth
            .or(previous.map(|p| p.max_depth))
            .unwrap_or(DEFAULT_MAX_DEPTH);

        Ok(Self {
            n_features,
            n_classes: previous.map_or(0, |p| p.n_classes).max(dataset.n_classes()),
            n_samples,
            m_features,
            leaf_size,
            max_depth,
        })
    }

    pub(crate) fn tree_params(&self) -> TreeParams {
        TreeParams {
            n_classes: self.n_classes,
            m_features: self.m_features,
            leaf_size: self.leaf_size,
            max_depth: self.max_depth,
        }
    }
}
