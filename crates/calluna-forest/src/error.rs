use crate::forest::TaskKind;

/// Errors from forest training, prediction, and the p-value routine.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when min_node_size is zero.
    #[error("min_node_size must be at least 1, got {min_node_size}")]
    InvalidMinNodeSize {
        /// The invalid min_node_size value provided.
        min_node_size: usize,
    },

    /// Returned when mtry is 0 or exceeds n_features.
    #[error("mtry resolved to {mtry}, but must be in [1, {n_features}]")]
    InvalidMtry {
        /// The resolved mtry value.
        mtry: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when sample_fraction is not in (0.0, 1.0].
    #[error("sample_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidSampleFraction {
        /// The invalid sample_fraction value provided.
        fraction: f64,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a regression target value is NaN or infinite.
    #[error("non-finite target value at sample {sample_index}")]
    NonFiniteTarget {
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the target length differs from the sample count.
    #[error("target has {got} entries, expected {expected}")]
    TargetLengthMismatch {
        /// The number of samples in the dataset.
        expected: usize,
        /// The number of target entries provided.
        got: usize,
    },

    /// Returned when the case-weight vector length differs from the sample count.
    #[error("case weights have {got} entries, expected {expected}")]
    CaseWeightLengthMismatch {
        /// The number of samples in the dataset.
        expected: usize,
        /// The number of case weights provided.
        got: usize,
    },

    /// Returned when a case weight is negative, NaN, or infinite.
    #[error("invalid case weight {weight} at sample {sample_index}")]
    InvalidCaseWeight {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The invalid weight value.
        weight: f64,
    },

    /// Returned when every case weight is zero.
    #[error("all case weights are zero, nothing can be sampled")]
    AllWeightsZero,

    /// Returned when holdout mode is requested without case weights.
    #[error("holdout importance requires case weights marking the held-out samples")]
    HoldoutWithoutWeights,

    /// Returned when a prediction input has the wrong number of features.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a prediction method is called on the wrong kind of forest.
    #[error("forest was trained for {found}, but {expected} was requested")]
    TaskMismatch {
        /// The task kind the requested prediction needs.
        expected: TaskKind,
        /// The task kind the forest was trained for.
        found: TaskKind,
    },

    /// Returned when conf_level is outside (0.0, 1.0).
    #[error("conf_level must be in (0.0, 1.0), got {conf_level}")]
    InvalidConfidenceLevel {
        /// The invalid confidence level provided.
        conf_level: f64,
    },

    /// Returned when no importance score is negative, so no empirical null
    /// distribution can be estimated.
    #[error("no negative importance values, cannot estimate the empirical null distribution")]
    NoNegativeImportance,

    /// Returned when building the scoped thread pool fails.
    #[error("failed to build thread pool")]
    ThreadPool {
        /// The underlying rayon error.
        source: rayon::ThreadPoolBuildError,
    },
}
