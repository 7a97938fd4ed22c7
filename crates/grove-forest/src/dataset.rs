//! Validated row store owned by the forest.

use std::collections::VecDeque;

use crate::error::ForestError;

/// Feature rows paired 1:1 with class labels.
///
/// Rows are fixed-width and finite. The store is append-only apart from
/// FIFO eviction of the oldest rows, which the continuous forest uses to
/// keep a sliding window of recent data.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: VecDeque<Vec<f64>>,
    labels: VecDeque<usize>,
    n_features: usize,
}

impl Dataset {
    /// Build a dataset from row-major features and their labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | `rows` is empty |
    /// | [`ForestError::ZeroFeatures`] | rows have zero columns |
    /// | [`ForestError::LabelCountMismatch`] | `rows.len() != labels.len()` |
    /// | [`ForestError::FeatureCountMismatch`] | rows have inconsistent widths |
    /// | [`ForestError::NonFiniteValue`] | any value is NaN or infinite |
    /// | [`ForestError::LabelOutOfRange`] | a label is `usize::MAX` |
    pub fn new(rows: Vec<Vec<f64>>, labels: Vec<usize>) -> Result<Self, ForestError> {
        if rows.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let n_features = rows[0].len();
        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }
        if rows.len() != labels.len() {
            return Err(ForestError::LabelCountMismatch {
                n_rows: rows.len(),
                n_labels: labels.len(),
            });
        }
        for (sample_index, (row, &label)) in rows.iter().zip(&labels).enumerate() {
            check_row(row, label, n_features, sample_index)?;
        }
        Ok(Self {
            rows: rows.into(),
            labels: labels.into(),
            n_features,
        })
    }

    /// Append one row at the back.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::FeatureCountMismatch`],
    /// [`ForestError::NonFiniteValue`] or [`ForestError::LabelOutOfRange`]
    /// if the row is malformed.
    pub fn push(&mut self, row: Vec<f64>, label: usize) -> Result<(), ForestError> {
        check_row(&row, label, self.n_features, self.rows.len())?;
        self.rows.push_back(row);
        self.labels.push_back(label);
        Ok(())
    }

    /// Evict the oldest rows until at most `max_rows` remain.
    ///
    /// Returns the number of evicted rows.
    pub fn evict_to(&mut self, max_rows: usize) -> usize {
        let excess = self.rows.len().saturating_sub(max_rows);
        self.rows.drain(..excess);
        self.labels.drain(..excess);
        excess
    }

    /// Return the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Return `true` if the dataset holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Return the row width.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return `1 + max(label)`.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.labels.iter().max().map_or(0, |&max| max + 1)
    }

    /// Borrow row `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    /// Return the label of row `index`.
    #[must_use]
    pub fn label(&self, index: usize) -> usize {
        self.labels[index]
    }

    /// Return a single feature value.
    #[must_use]
    pub(crate) fn value(&self, index: usize, feature: usize) -> f64 {
        self.rows[index][feature]
    }

    /// Iterate over rows, oldest first.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Iterate over labels, oldest first.
    pub fn labels(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.labels.iter().copied()
    }
}

fn check_row(
    row: &[f64],
    label: usize,
    n_features: usize,
    sample_index: usize,
) -> Result<(), ForestError> {
    if label.checked_add(1).is_none() {
        return Err(ForestError::LabelOutOfRange {
            sample_index,
            label,
        });
    }
    if row.len() != n_features {
        return Err(ForestError::FeatureCountMismatch {
            expected: n_features,
            got: row.len(),
            sample_index,
        });
    }
    if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
        return Err(ForestError::NonFiniteValue {
            sample_index,
            feature_index,
        });
    }
    Ok(())
}
