//! Feature importance aggregation across trees.

use crate::node::FeatureIndex;
use crate::tree::DecisionTree;

/// A ranked feature with its importance score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RankedFeature {
    /// The feature column.
    pub feature: FeatureIndex,
    /// Normalized importance score (sums to 1.0 across all features).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Aggregate per-tree normalized importances into one vector.
///
/// Sums each tree's normalized vector, then normalizes the totals to sum
/// to 1.0. This equals the per-tree mean whenever every tree split at least
/// once. All zeros when no tree split at all.
pub(crate) fn aggregate_importances(trees: &[DecisionTree], n_features: usize) -> Vec<f64> {
    let mut totals = vec![0.0f64; n_features];
    for tree in trees {
        for (total, value) in totals.iter_mut().zip(tree.feature_importances()) {
            *total += value;
        }
    }

    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }
    totals
}

/// Sort features descending by importance and assign 1-based ranks.
pub(crate) fn rank_importances(importances: &[f64]) -> Vec<RankedFeature> {
    let mut features: Vec<RankedFeature> = importances
        .iter()
        .enumerate()
        .map(|(i, &importance)| RankedFeature {
            feature: FeatureIndex::new(i),
            importance,
            rank: 0, // will be set after sorting
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_descending() {
        let ranked = rank_importances(&[0.2, 0.5, 0.3]);
        let order: Vec<usize> = ranked.iter().map(|f| f.feature.index()).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn no_trees_gives_zeros() {
        assert_eq!(aggregate_importances(&[], 3), vec![0.0, 0.0, 0.0]);
    }
}
