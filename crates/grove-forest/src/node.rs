use std::fmt;

/// Zero-based feature column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gini impurity of the rows that reached a node.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Impurity(f64);

impl Impurity {
    /// Create a new impurity value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Children are referenced by [`NodeIndex`]. Every `Decision` owns exactly
/// two children, and no node is shared between parents.
#[derive(Debug, Clone)]
pub enum Node {
    /// An interior split node.
    Decision {
        /// Feature used for the split.
        feature: FeatureIndex,
        /// Rows with `row[feature] > threshold` go to `high`, the rest to `low`.
        threshold: f64,
        /// Child receiving rows at or below the threshold.
        low: NodeIndex,
        /// Child receiving rows above the threshold.
        high: NodeIndex,
        /// Impurity of the rows at this node before splitting.
        impurity: Impurity,
        /// Parent impurity minus the weighted impurity of the two children.
        gini_gain: f64,
        /// Number of (bootstrap) rows that reached this node.
        n_samples: usize,
        /// Depth in the tree (the root has depth 1).
        depth: usize,
    },
    /// A terminal node.
    Leaf {
        /// Empirical class frequencies of the rows at this leaf.
        distribution: Vec<f64>,
        /// Impurity of the rows at this leaf.
        impurity: Impurity,
        /// Number of (bootstrap) rows that reached this leaf.
        n_samples: usize,
        /// Depth in the tree (the root has depth 1).
        depth: usize,
    },
}

impl Node {
    /// Return the impurity at this node (before splitting for decision nodes).
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Decision { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the number of rows that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Decision { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return the depth of this node.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Node::Decision { depth, .. } | Node::Leaf { depth, .. } => *depth,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}
