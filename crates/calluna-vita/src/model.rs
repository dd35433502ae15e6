//! Model wrapper: validation, hyperparameter derivation, and delegation to
//! the forest engine.

use calluna_forest::{ForestConfig, ForestFit, ImportanceMode, Target};
use tracing::{debug, instrument};

use crate::error::VitaError;
use crate::table::{FeatureTable, Outcome};

/// The kind of prediction problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Continuous outcome.
    Regression,
    /// Categorical outcome, single-label predictions.
    Classification,
    /// Categorical outcome, class-probability predictions.
    Probability,
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::Regression => write!(f, "regression"),
            Task::Classification => write!(f, "classification"),
            Task::Probability => write!(f, "probability"),
        }
    }
}

/// The training backend. Only the native engine is supported; unknown
/// backend names fail in [`Backend::from_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// The calluna-forest engine.
    #[default]
    Native,
}

impl Backend {
    /// Resolve a backend by name.
    ///
    /// # Errors
    ///
    /// Returns [`VitaError::UnsupportedMethod`] for any name other than
    /// `"native"` or `"calluna"`.
    pub fn from_name(name: &str) -> Result<Self, VitaError> {
        match name {
            "native" | "calluna" => Ok(Backend::Native),
            other => Err(VitaError::UnsupportedMethod {
                method: other.to_string(),
            }),
        }
    }
}

/// Configuration for the model wrapper.
///
/// Construct via [`ModelConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter       | Default          |
/// |-----------------|------------------|
/// | `n_trees`       | 500              |
/// | `mtry_prop`     | 0.2              |
/// | `min_node_prop` | 0.1              |
/// | `task`          | `Classification` |
/// | `importance`    | `Permutation`    |
/// | `case_weights`  | `None`           |
/// | `holdout`       | `false`          |
/// | `replace`       | `true`           |
/// | `n_threads`     | `None`           |
/// | `backend`       | `Native`         |
/// | `seed`          | 42               |
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub(crate) n_trees: usize,
    pub(crate) mtry_prop: f64,
    pub(crate) min_node_prop: f64,
    pub(crate) n_threads: Option<usize>,
    pub(crate) task: Task,
    pub(crate) importance: ImportanceMode,
    pub(crate) case_weights: Option<Vec<f64>>,
    pub(crate) holdout: bool,
    pub(crate) replace: bool,
    pub(crate) backend: Backend,
    pub(crate) seed: u64,
}

impl ModelConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_trees: 500,
            mtry_prop: 0.2,
            min_node_prop: 0.1,
            n_threads: None,
            task: Task::Classification,
            importance: ImportanceMode::Permutation,
            case_weights: None,
            holdout: false,
            replace: true,
            backend: Backend::Native,
            seed: 42,
        }
    }

    // --- Setters ---

    /// Set the number of trees.
    #[must_use]
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// Set the proportion of variables tried at each split.
    #[must_use]
    pub fn with_mtry_prop(mut self, mtry_prop: f64) -> Self {
        self.mtry_prop = mtry_prop;
        self
    }

    /// Set the minimum leaf size as a proportion of the sample count.
    #[must_use]
    pub fn with_min_node_prop(mut self, min_node_prop: f64) -> Self {
        self.min_node_prop = min_node_prop;
        self
    }

    /// Set the number of threads passed through to the engine.
    #[must_use]
    pub fn with_n_threads(mut self, n_threads: Option<usize>) -> Self {
        self.n_threads = n_threads;
        self
    }

    /// Set the prediction task.
    #[must_use]
    pub fn with_task(mut self, task: Task) -> Self {
        self.task = task;
        self
    }

    /// Set the importance mode.
    #[must_use]
    pub fn with_importance(mut self, importance: ImportanceMode) -> Self {
        self.importance = importance;
        self
    }

    /// Set per-sample case weights.
    #[must_use]
    pub fn with_case_weights(mut self, case_weights: Option<Vec<f64>>) -> Self {
        self.case_weights = case_weights;
        self
    }

    /// Set holdout importance evaluation.
    #[must_use]
    pub fn with_holdout(mut self, holdout: bool) -> Self {
        self.holdout = holdout;
        self
    }

    /// Set whether per-tree samples are drawn with replacement.
    #[must_use]
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Set the training backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the random seed.
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

    /// Return the mtry proportion.
    #[must_use]
    pub fn mtry_prop(&self) -> f64 {
        self.mtry_prop
    }

    /// Return the minimum-node-size proportion.
    #[must_use]
    pub fn min_node_prop(&self) -> f64 {
        self.min_node_prop
    }

    /// Return the prediction task.
    #[must_use]
    pub fn task(&self) -> Task {
        self.task
    }

    /// Return the importance mode.
    #[must_use]
    pub fn importance(&self) -> ImportanceMode {
        self.importance
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a forest on the given table and outcome.
    ///
    /// Convenience for [`train_forest`] with this config.
    ///
    /// # Errors
    ///
    /// See [`train_forest`].
    pub fn train(&self, x: &FeatureTable, y: &Outcome) -> Result<FittedModel, VitaError> {
        train_forest(self, x, y)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive the candidate-variable count from a proportion, clamped to >= 1.
pub(crate) fn derived_mtry(mtry_prop: f64, n_cols: usize) -> usize {
    ((mtry_prop * n_cols as f64).floor() as usize).max(1)
}

/// Derive the minimum leaf size from a proportion, clamped to >= 1.
pub(crate) fn derived_min_node_size(min_node_prop: f64, n_rows: usize) -> usize {
    ((min_node_prop * n_rows as f64).floor() as usize).max(1)
}

/// Predictions from a fitted model, shaped by its task.
#[derive(Debug, Clone)]
pub enum Predictions {
    /// Predicted level names (classification).
    Labels(Vec<String>),
    /// Per-sample class probabilities, columns ordered as `levels`.
    Probabilities {
        /// The outcome levels, in column order.
        levels: Vec<String>,
        /// One probability row per sample.
        rows: Vec<Vec<f64>>,
    },
    /// Predicted continuous values (regression).
    Values(Vec<f64>),
}

/// A fitted model: the engine fit plus the metadata needed to decode
/// predictions back into the caller's vocabulary.
#[derive(Debug)]
pub struct FittedModel {
    fit: ForestFit,
    task: Task,
    importance_mode: ImportanceMode,
    levels: Vec<String>,
    variable_names: Vec<String>,
}

impl FittedModel {
    /// Return the task this model was trained for.
    #[must_use]
    pub fn task(&self) -> Task {
        self.task
    }

    /// Return the importance mode used during training.
    #[must_use]
    pub fn importance_mode(&self) -> ImportanceMode {
        self.importance_mode
    }

    /// Return the outcome levels (empty for regression).
    #[must_use]
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Return the variable names, in table column order.
    #[must_use]
    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    /// Per-variable importance scores, in table column order.
    ///
    /// Empty when the model was trained with [`ImportanceMode::None`].
    #[must_use]
    pub fn importance(&self) -> &[f64] {
        self.fit.importance().unwrap_or(&[])
    }

    /// Predict on new data, shaped by the model's task.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`VitaError::InvalidInput`] | the table contains a missing value |
    /// | [`VitaError::Engine`] | feature-count mismatch, among others |
    pub fn predict(&self, x: &FeatureTable) -> Result<Predictions, VitaError> {
        x.check_no_missing()?;
        match self.task {
            Task::Regression => {
                let values = self.fit.forest().predict_value_batch(x.rows())?;
                Ok(Predictions::Values(values))
            }
            Task::Classification => Ok(Predictions::Labels(self.predict_labels(x)?)),
            Task::Probability => {
                let rows = self.fit.forest().predict_proba_batch(x.rows())?;
                Ok(Predictions::Probabilities {
                    levels: self.levels.clone(),
                    rows,
                })
            }
        }
    }

    /// Predict level names on new data.
    ///
    /// For probability models this is the argmax of the class distribution.
    ///
    /// # Errors
    ///
    /// Same as [`FittedModel::predict`]; regression models fail with the
    /// engine's task-mismatch error.
    pub fn predict_labels(&self, x: &FeatureTable) -> Result<Vec<String>, VitaError> {
        x.check_no_missing()?;
        let classes = self.fit.forest().predict_class_batch(x.rows())?;
        Ok(classes
            .into_iter()
            .map(|c| self.levels[c].clone())
            .collect())
    }
}

/// The training capability the holdout trainer depends on.
pub trait TrainableForest {
    /// The fitted model type the engine produces.
    type Fitted: FittedForest;

    /// Train one forest with the given configuration.
    fn train(
        &self,
        config: &ModelConfig,
        x: &FeatureTable,
        y: &Outcome,
    ) -> Result<Self::Fitted, VitaError>;
}

/// Read access to a fitted forest's importance scores.
pub trait FittedForest {
    /// Per-variable importance, in table column order.
    fn importance(&self) -> &[f64];
}

impl FittedForest for FittedModel {
    fn importance(&self) -> &[f64] {
        FittedModel::importance(self)
    }
}

/// The native engine: delegates to [`train_forest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl TrainableForest for NativeEngine {
    type Fitted = FittedModel;

    fn train(
        &self,
        config: &ModelConfig,
        x: &FeatureTable,
        y: &Outcome,
    ) -> Result<FittedModel, VitaError> {
        train_forest(config, x, y)
    }
}

/// Render a numeric outcome value as a level label.
pub(crate) fn numeric_label(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Coerce an outcome to categorical labels (classification/probability).
fn coerce_categorical(y: &Outcome) -> Vec<String> {
    match y {
        Outcome::Categorical(labels) => labels.clone(),
        Outcome::Numeric(values) => values.iter().map(|&v| numeric_label(v)).collect(),
    }
}

/// Encode labels against their sorted unique levels.
fn encode_labels(labels: &[String]) -> (Vec<String>, Vec<usize>) {
    let mut levels: Vec<String> = labels.to_vec();
    levels.sort();
    levels.dedup();
    let encoded = labels
        .iter()
        .map(|l| levels.binary_search(l).expect("label is one of its levels"))
        .collect();
    (levels, encoded)
}

/// Validate inputs, derive hyperparameters, and train one forest.
///
/// Preconditions are checked before any training starts:
/// outcome length must equal the table's row count; the table must contain
/// no missing values; regression and probability tasks require a numeric
/// outcome. Classification coerces numeric outcomes to categorical labels;
/// probability also coerces, and the fitted model predicts class
/// probabilities.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`VitaError::DimensionMismatch`] | outcome length != row count |
/// | [`VitaError::InvalidInput`] | the table contains a missing value |
/// | [`VitaError::TypeMismatch`] | categorical outcome with a numeric-only task |
/// | [`VitaError::Engine`] | any engine failure, propagated unchanged |
#[instrument(skip_all, fields(n_rows = x.n_rows(), n_cols = x.n_cols(), task = %config.task))]
pub fn train_forest(
    config: &ModelConfig,
    x: &FeatureTable,
    y: &Outcome,
) -> Result<FittedModel, VitaError> {
    if y.len() != x.n_rows() {
        return Err(VitaError::DimensionMismatch {
            expected: x.n_rows(),
            got: y.len(),
        });
    }
    x.check_no_missing()?;

    let (target, levels) = match config.task {
        Task::Regression => match y {
            Outcome::Numeric(values) => (Target::Values(values.clone()), Vec::new()),
            Outcome::Categorical(_) => {
                return Err(VitaError::TypeMismatch { task: config.task });
            }
        },
        Task::Classification => {
            let labels = coerce_categorical(y);
            let (levels, encoded) = encode_labels(&labels);
            (Target::Classes(encoded), levels)
        }
        Task::Probability => {
            // Probability mode accepts only numeric outcomes, then treats
            // them as categorical levels.
            let Outcome::Numeric(_) = y else {
                return Err(VitaError::TypeMismatch { task: config.task });
            };
            let labels = coerce_categorical(y);
            let (levels, encoded) = encode_labels(&labels);
            (Target::Classes(encoded), levels)
        }
    };

    let mtry = derived_mtry(config.mtry_prop, x.n_cols());
    let min_node_size = derived_min_node_size(config.min_node_prop, x.n_rows());
    debug!(mtry, min_node_size, "derived hyperparameters");

    let Backend::Native = config.backend;
    let engine_config = ForestConfig::new(config.n_trees)?
        .with_mtry(Some(mtry))
        .with_min_node_size(min_node_size)
        .with_replace(config.replace)
        .with_holdout(config.holdout)
        .with_case_weights(config.case_weights.clone())
        .with_importance(config.importance)
        .with_n_threads(config.n_threads)
        .with_seed(config.seed);

    let fit = engine_config.fit(x.rows(), &target)?;

    Ok(FittedModel {
        fit,
        task: config.task,
        importance_mode: config.importance,
        levels,
        variable_names: x.names().to_vec(),
    })
}
