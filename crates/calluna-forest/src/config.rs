//! Configuration builder for forest training.

use crate::error::ForestError;
use crate::forest::ForestFit;
use crate::target::Target;

/// Which per-variable importance to compute during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportanceMode {
    /// No importance computation.
    None,
    /// Permutation importance on each tree's evaluation set.
    Permutation,
}

impl std::fmt::Display for ImportanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportanceMode::None => write!(f, "none"),
            ImportanceMode::Permutation => write!(f, "permutation"),
        }
    }
}

/// Configuration for forest training.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter         | Default                                   |
/// |-------------------|-------------------------------------------|
/// | `mtry`            | `None` (sqrt of feature count)            |
/// | `min_node_size`   | 1                                         |
/// | `sample_fraction` | `None` (1.0 with replacement, 0.632 else) |
/// | `replace`         | `true`                                    |
/// | `holdout`         | `false`                                   |
/// | `case_weights`    | `None`                                    |
/// | `importance`      | `None`                                    |
/// | `n_threads`       | `None` (global rayon pool)                |
/// | `seed`            | 42                                        |
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) mtry: Option<usize>,
    pub(crate) min_node_size: usize,
    pub(crate) sample_fraction: Option<f64>,
    pub(crate) replace: bool,
    pub(crate) holdout: bool,
    pub(crate) case_weights: Option<Vec<f64>>,
    pub(crate) importance: ImportanceMode,
    pub(crate) n_threads: Option<usize>,
    pub(crate) seed: u64,
}

impl ForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            mtry: None,
            min_node_size: 1,
            sample_fraction: None,
            replace: true,
            holdout: false,
            case_weights: None,
            importance: ImportanceMode::None,
            n_threads: None,
            seed: 42,
        })
    }

    // --- Setters ---

    /// Set the number of candidate features per split. `None` means sqrt.
    #[must_use]
    pub fn with_mtry(mut self, mtry: Option<usize>) -> Self {
        self.mtry = mtry;
        self
    }

    /// Set the minimum node size; nodes at or below this size become leaves.
    #[must_use]
    pub fn with_min_node_size(mut self, min_node_size: usize) -> Self {
        self.min_node_size = min_node_size;
        self
    }

    /// Set the fraction of samples drawn per tree. `None` uses 1.0 when
    /// sampling with replacement and 0.632 without.
    #[must_use]
    pub fn with_sample_fraction(mut self, sample_fraction: Option<f64>) -> Self {
        self.sample_fraction = sample_fraction;
        self
    }

    /// Set whether per-tree samples are drawn with replacement.
    #[must_use]
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Set holdout mode: importance is evaluated on the zero-weight samples
    /// instead of each tree's out-of-bag samples. Requires case weights.
    #[must_use]
    pub fn with_holdout(mut self, holdout: bool) -> Self {
        self.holdout = holdout;
        self
    }

    /// Set per-sample case weights controlling selection probability.
    #[must_use]
    pub fn with_case_weights(mut self, case_weights: Option<Vec<f64>>) -> Self {
        self.case_weights = case_weights;
        self
    }

    /// Set the importance mode.
    #[must_use]
    pub fn with_importance(mut self, importance: ImportanceMode) -> Self {
        self.importance = importance;
        self
    }

    /// Set the number of threads. `None` uses the global rayon pool.
    #[must_use]
    pub fn with_n_threads(mut self, n_threads: Option<usize>) -> Self {
        self.n_threads = n_threads;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the configured mtry, if any.
    #[must_use]
    pub fn mtry(&self) -> Option<usize> {
        self.mtry
    }

    /// Return the minimum node size.
    #[must_use]
    pub fn min_node_size(&self) -> usize {
        self.min_node_size
    }

    /// Return the configured sample fraction, if any.
    #[must_use]
    pub fn sample_fraction(&self) -> Option<f64> {
        self.sample_fraction
    }

    /// Return whether samples are drawn with replacement.
    #[must_use]
    pub fn replace(&self) -> bool {
        self.replace
    }

    /// Return whether holdout importance evaluation is enabled.
    #[must_use]
    pub fn holdout(&self) -> bool {
        self.holdout
    }

    /// Return the case weights, if any.
    #[must_use]
    pub fn case_weights(&self) -> Option<&[f64]> {
        self.case_weights.as_deref()
    }

    /// Return the importance mode.
    #[must_use]
    pub fn importance(&self) -> ImportanceMode {
        self.importance
    }

    /// Return the configured thread count, if any.
    #[must_use]
    pub fn n_threads(&self) -> Option<usize> {
        self.n_threads
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a forest on the provided dataset.
    ///
    /// `features[sample_idx][feature_idx]` — row-major layout.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                                      |
    /// |--------------------------------------------|-------------------------------------------|
    /// | [`ForestError::EmptyDataset`]              | `features` is empty                       |
    /// | [`ForestError::ZeroFeatures`]              | rows have zero feature columns            |
    /// | [`ForestError::FeatureCountMismatch`]      | rows have inconsistent lengths            |
    /// | [`ForestError::NonFiniteValue`]            | any feature value is NaN or infinite      |
    /// | [`ForestError::NonFiniteTarget`]           | any regression target is NaN or infinite  |
    /// | [`ForestError::TargetLengthMismatch`]      | target length differs from sample count   |
    /// | [`ForestError::InvalidMtry`]               | mtry is outside [1, n_features]           |
    /// | [`ForestError::InvalidMinNodeSize`]        | `min_node_size` is zero                   |
    /// | [`ForestError::InvalidSampleFraction`]     | `sample_fraction` is outside (0.0, 1.0]   |
    /// | [`ForestError::CaseWeightLengthMismatch`]  | weight length differs from sample count   |
    /// | [`ForestError::InvalidCaseWeight`]         | a weight is negative or non-finite        |
    /// | [`ForestError::AllWeightsZero`]            | every case weight is zero                 |
    /// | [`ForestError::HoldoutWithoutWeights`]     | holdout mode without case weights         |
    /// | [`ForestError::ThreadPool`]                | the scoped thread pool cannot be built    |
    pub fn fit(&self, features: &[Vec<f64>], target: &Target) -> Result<ForestFit, ForestError> {
        crate::forest::train(self, features, target)
    }
}
