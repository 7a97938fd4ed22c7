use rand::Rng;

use crate::dataset::Dataset;
use crate::node::FeatureIndex;
use crate::stats::gini;

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Rows with a value strictly greater than this go high.
    pub(crate) threshold: f64,
    /// Size-weighted mean Gini impurity of the two children.
    pub(crate) weighted_impurity: f64,
    /// Row indices going to the low child.
    pub(crate) low_indices: Vec<usize>,
    /// Row indices going to the high child.
    pub(crate) high_indices: Vec<usize>,
}

/// Draw `m_features` distinct feature indices uniformly at random.
///
/// Partial Fisher-Yates: only the first `m_features` positions are shuffled.
pub(crate) fn draw_candidate_features(
    n_features: usize,
    m_features: usize,
    rng: &mut impl Rng,
) -> Vec<FeatureIndex> {
    let mut order: Vec<usize> = (0..n_features).collect();
    let take = m_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        order.swap(i, j);
    }
    order[..take].iter().map(|&f| FeatureIndex::new(f)).collect()
}

/// Find the split among `candidates` with the lowest weighted child impurity.
///
/// For each candidate the node's rows are sorted by that feature and swept
/// low-to-high with incremental class counts. A boundary is evaluated each
/// time the value strictly increases; its threshold is the last value seen
/// before the increase. The first boundary that strictly beats the best so
/// far wins, starting from `parent_impurity`.
///
/// `sample_indices` index into `dataset` and may repeat (bootstrap draws).
///
/// Returns `None` when no boundary strictly reduces impurity, e.g. when
/// every candidate feature is constant over the node.
pub(crate) fn find_best_split(
    dataset: &Dataset,
    sample_indices: &[usize],
    class_counts: &[usize],
    parent_impurity: f64,
    candidates: &[FeatureIndex],
) -> Option<SplitResult> {
    let n_samples = sample_indices.len();
    if n_samples < 2 {
        return None;
    }
    let n = n_samples as f64;
    let n_classes = class_counts.len();

    let mut best_impurity = parent_impurity;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feature in candidates {
        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (dataset.value(si, feature.index()), si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut low_counts = vec![0usize; n_classes];
        let mut high_counts = class_counts.to_vec();
        let mut current = sorted[0].0;

        for (n_low, &(value, si)) in sorted.iter().enumerate() {
            if value > current {
                let n_high = n_samples - n_low;
                let weighted =
                    (gini(&low_counts) * n_low as f64 + gini(&high_counts) * n_high as f64) / n;
                if weighted < best_impurity {
                    best_impurity = weighted;
                    best = Some((feature, current));
                }
                current = value;
            }
            let class = dataset.label(si);
            low_counts[class] += 1;
            high_counts[class] -= 1;
        }
    }

    let (feature, threshold) = best?;
    let (high_indices, low_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| dataset.value(si, feature.index()) > threshold);

    Some(SplitResult {
        feature,
        threshold,
        weighted_impurity: best_impurity,
        low_indices,
        high_indices,
    })
}
