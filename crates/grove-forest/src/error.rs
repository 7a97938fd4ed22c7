/// Errors from random forest operations.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when a training call asks for zero trees.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when an explicit m_features exceeds the number of features.
    #[error("m_features is {m_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The configured m_features value.
        m_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when the dataset has zero rows.
    #[error("dataset has zero rows")]
    EmptyDataset,

    /// Returned when the dataset has zero feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a row has a different number of features than expected.
    #[error("row {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the row.
        got: usize,
        /// The zero-based index of the offending row.
        sample_index: usize,
    },

    /// Returned when the row and label vectors differ in length.
    #[error("got {n_rows} rows but {n_labels} labels")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a label is too large for `label + 1` classes to be counted.
    #[error("label {label} at row {sample_index} is out of range")]
    LabelOutOfRange {
        /// The zero-based index of the offending row.
        sample_index: usize,
        /// The offending label.
        label: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at row {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending row.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a query row has the wrong number of features.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the query row.
        got: usize,
    },

    /// Returned when predictions and labels differ in length.
    #[error("got {predictions} predictions but {labels} labels")]
    LengthMismatch {
        /// Number of predictions.
        predictions: usize,
        /// Number of true labels.
        labels: usize,
    },

    /// Returned when a quantile is requested outside [0, 1].
    #[error("quantile must be in [0, 1], got {q}")]
    InvalidQuantile {
        /// The invalid quantile.
        q: f64,
    },

    /// Returned when a query needs trees but the forest has none.
    #[error("forest has no trees; call train or add_data_row first")]
    EmptyForest,

    /// Returned by weighted voting when every tree has a non-positive weight.
    #[error("no tree has a positive validation weight")]
    ZeroTotalWeight,

    /// Returned when the dedicated worker pool cannot be created.
    #[error("failed to build worker pool with {n_workers} threads")]
    WorkerPool {
        /// The requested number of workers.
        n_workers: usize,
        /// The underlying rayon error.
        source: rayon::ThreadPoolBuildError,
    },
}
