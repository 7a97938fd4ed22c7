//! Random forest ensembles: train, vote, predict, score, and grow online.
//!
//! Provides Gini-split classification trees built on bootstrap samples by a
//! bounded worker pool, unweighted and validation-weighted voting, out-of-bag
//! validation, feature importance, isolation-depth scoring, and a continuous
//! mode that absorbs rows one at a time under row and tree retention limits.

mod config;
mod dataset;
mod error;
mod eval;
mod forest;
mod importance;
mod isolation;
mod node;
mod pool;
mod predict;
mod split;
mod stats;
mod tree;

pub use config::{ForestConfig, ForestParams};
pub use dataset::Dataset;
pub use error::ForestError;
pub use eval::{ValidationSummary, accuracy};
pub use forest::RandomForest;
pub use importance::RankedFeature;
pub use isolation::IsolationScores;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use pool::WorkerPool;
pub use predict::ClassDistribution;
pub use stats::{gini, mean, quantile, std_dev, variance};
pub use tree::DecisionTree;
