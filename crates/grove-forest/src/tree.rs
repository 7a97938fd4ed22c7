use rand::Rng;

use crate::{
    ForestError,
    dataset::Dataset,
    node::{Impurity, Node, NodeIndex},
    split::{draw_candidate_features, find_best_split},
    stats::gini,
};

/// Depth of the root node.
const ROOT_DEPTH: usize = 1;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TreeParams {
    pub(crate) n_classes: usize,
    pub(crate) m_features: usize,
    pub(crate) leaf_size: usize,
    pub(crate) max_depth: usize,
}

/// A fitted decision tree.
///
/// Stored as an arena of [`Node`]s with the root at index 0. Trees are never
/// mutated after the forest publishes them.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) validation: f64,
}

impl DecisionTree {
    /// Grow a tree over `sample_indices` (which may repeat) of `dataset`.
    ///
    /// Candidate features are drawn from `rng` at every decision node, so the
    /// same indices and the same generator state always give the same tree.
    /// The validation score starts undefined (NaN).
    pub(crate) fn grow(
        dataset: &Dataset,
        sample_indices: &[usize],
        params: &TreeParams,
        rng: &mut impl Rng,
    ) -> Self {
        let mut arena = Vec::new();
        let root = build_node(dataset, sample_indices, params, ROOT_DEPTH, rng, &mut arena);
        debug_assert_eq!(root.index(), 0);
        Self {
            nodes: arena,
            n_features: dataset.n_features(),
            n_classes: params.n_classes,
            validation: f64::NAN,
        }
    }

    /// Return the class probability vector of the leaf `row` falls into.
    ///
    /// The slice has length [`n_classes`](Self::n_classes) as of construction.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `row.len() != n_features`.
    pub fn vote(&self, row: &[f64]) -> Result<&[f64], ForestError> {
        self.check_width(row)?;
        Ok(self.distribution_of(row))
    }

    /// Return the depth of the leaf `row` falls into.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `row.len() != n_features`.
    pub fn depth_of(&self, row: &[f64]) -> Result<usize, ForestError> {
        self.check_width(row)?;
        Ok(self.descend(row).depth())
    }

    /// Leaf distribution for a row whose width the caller already checked.
    pub(crate) fn distribution_of(&self, row: &[f64]) -> &[f64] {
        match self.descend(row) {
            Node::Leaf { distribution, .. } => distribution.as_slice(),
            Node::Decision { .. } => unreachable!("descent always ends at a leaf"),
        }
    }

    /// Add each decision node's `n_samples * impurity` to `accumulator[feature]`.
    ///
    /// `accumulator` must have at least [`n_features`](Self::n_features) entries.
    pub fn accumulate_importance(&self, accumulator: &mut [f64]) {
        self.accumulate_from(NodeIndex::new(0), accumulator);
    }

    fn accumulate_from(&self, index: NodeIndex, accumulator: &mut [f64]) {
        if let Node::Decision {
            feature,
            low,
            high,
            impurity,
            n_samples,
            ..
        } = &self.nodes[index.index()]
        {
            self.accumulate_from(*low, accumulator);
            self.accumulate_from(*high, accumulator);
            accumulator[feature.index()] += *n_samples as f64 * impurity.value();
        }
    }

    /// Per-feature importance normalized to sum to 1.0.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        self.accumulate_importance(&mut totals);
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Out-of-bag validation score: mean probability given to the true label
    /// over rows the bootstrap never drew. NaN when there were no such rows.
    #[must_use]
    pub fn validation(&self) -> f64 {
        self.validation
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Return the node arena.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the depth of the deepest leaf. A single-leaf tree has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(Node::depth)
            .max()
            .unwrap_or(ROOT_DEPTH)
    }

    /// Return the row width this tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes known when this tree was built.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub(crate) fn check_width(&self, row: &[f64]) -> Result<(), ForestError> {
        if row.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: row.len(),
            });
        }
        Ok(())
    }

    /// Walk from the root to the leaf `row` falls into.
    pub(crate) fn descend(&self, row: &[f64]) -> &Node {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                leaf @ Node::Leaf { .. } => return leaf,
                Node::Decision {
                    feature,
                    threshold,
                    low,
                    high,
                    ..
                } => {
                    idx = if row[feature.index()] > *threshold {
                        high.index()
                    } else {
                        low.index()
                    };
                }
            }
        }
    }
}

/// Recursively build the arena; returns the index of the node just created.
fn build_node(
    dataset: &Dataset,
    sample_indices: &[usize],
    params: &TreeParams,
    depth: usize,
    rng: &mut impl Rng,
    arena: &mut Vec<Node>,
) -> NodeIndex {
    let n_samples = sample_indices.len();

    let mut class_counts = vec![0usize; params.n_classes];
    for &si in sample_indices {
        class_counts[dataset.label(si)] += 1;
    }
    let impurity = gini(&class_counts);

    let make_leaf = |arena: &mut Vec<Node>| -> NodeIndex {
        let distribution = if n_samples == 0 {
            vec![0.0; params.n_classes]
        } else {
            let total = n_samples as f64;
            class_counts.iter().map(|&c| c as f64 / total).collect()
        };
        let idx = arena.len();
        arena.push(Node::Leaf {
            distribution,
            impurity: Impurity::new(impurity),
            n_samples,
            depth,
        });
        NodeIndex::new(idx)
    };

    if n_samples <= params.leaf_size || impurity == 0.0 || depth >= params.max_depth {
        return make_leaf(arena);
    }

    let candidates = draw_candidate_features(dataset.n_features(), params.m_features, rng);
    let Some(split) = find_best_split(dataset, sample_indices, &class_counts, impurity, &candidates)
    else {
        return make_leaf(arena);
    };

    // Reserve this node's slot so children land after it, then overwrite.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        distribution: Vec::new(),
        impurity: Impurity::new(impurity),
        n_samples,
        depth,
    });

    let low = build_node(dataset, &split.low_indices, params, depth + 1, rng, arena);
    let high = build_node(dataset, &split.high_indices, params, depth + 1, rng, arena);

    arena[node_idx] = Node::Decision {
        feature: split.feature,
        threshold: split.threshold,
        low,
        high,
        impurity: Impurity::new(impurity),
        gini_gain: impurity - split.weighted_impurity,
        n_samples,
        depth,
    };

    NodeIndex::new(node_idx)
}
