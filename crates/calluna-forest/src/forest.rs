//! Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{ForestConfig, ImportanceMode};
use crate::error::ForestError;
use crate::importance::compute_permutation_importance;
use crate::sample::draw_sample;
use crate::target::{Target, TargetView};
use crate::tree::Tree;

/// Whether a forest predicts class labels or continuous values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TaskKind {
    /// Trees vote on class labels.
    Classification,
    /// Trees average continuous values.
    Regression,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Classification => write!(f, "classification"),
            TaskKind::Regression => write!(f, "regression"),
        }
    }
}

/// A fitted forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Forest {
    pub(crate) trees: Vec<Tree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) task: TaskKind,
}

/// Result of forest training: the ensemble plus optional importances.
#[derive(Debug)]
pub struct ForestFit {
    forest: Forest,
    importance: Option<Vec<f64>>,
}

impl ForestFit {
    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Consume the fit and return the forest.
    #[must_use]
    pub fn into_forest(self) -> Forest {
        self.forest
    }

    /// Per-variable importance scores, when importance was requested.
    ///
    /// Raw (unnormalized) permutation scores; negative values are meaningful
    /// and feed the empirical-null p-value routine.
    #[must_use]
    pub fn importance(&self) -> Option<&[f64]> {
        self.importance.as_deref()
    }
}

/// Train the forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &ForestConfig,
    features: &[Vec<f64>],
    target: &Target,
) -> Result<ForestFit, ForestError> {
    // --- Validate inputs ---
    if features.is_empty() {
        return Err(ForestError::EmptyDataset);
    }
    let n_samples = features.len();
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(ForestError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(ForestError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
    }

    if target.len() != n_samples {
        return Err(ForestError::TargetLengthMismatch {
            expected: n_samples,
            got: target.len(),
        });
    }
    if let Target::Values(values) = target {
        for (sample_index, &v) in values.iter().enumerate() {
            if !v.is_finite() {
                return Err(ForestError::NonFiniteTarget { sample_index });
            }
        }
    }

    // --- Validate config ---
    if config.min_node_size == 0 {
        return Err(ForestError::InvalidMinNodeSize { min_node_size: 0 });
    }

    let mtry = config.mtry.unwrap_or_else(|| {
        ((n_features as f64).sqrt().ceil() as usize).max(1)
    });
    if mtry == 0 || mtry > n_features {
        return Err(ForestError::InvalidMtry { mtry, n_features });
    }

    let sample_fraction = config
        .sample_fraction
        .unwrap_or(if config.replace { 1.0 } else { 0.632 });
    if sample_fraction <= 0.0 || sample_fraction > 1.0 {
        return Err(ForestError::InvalidSampleFraction {
            fraction: sample_fraction,
        });
    }

    if let Some(weights) = &config.case_weights {
        if weights.len() != n_samples {
            return Err(ForestError::CaseWeightLengthMismatch {
                expected: n_samples,
                got: weights.len(),
            });
        }
        for (sample_index, &w) in weights.iter().enumerate() {
            if !w.is_finite() || w < 0.0 {
                return Err(ForestError::InvalidCaseWeight {
                    sample_index,
                    weight: w,
                });
            }
        }
        if weights.iter().all(|&w| w == 0.0) {
            return Err(ForestError::AllWeightsZero);
        }
    }
    if config.holdout && config.case_weights.is_none() {
        return Err(ForestError::HoldoutWithoutWeights);
    }

    // --- Derived values ---
    let (task, view) = match target {
        Target::Classes(labels) => {
            let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
            (
                TaskKind::Classification,
                TargetView::Classes {
                    labels,
                    n_classes,
                },
            )
        }
        Target::Values(values) => (TaskKind::Regression, TargetView::Values(values)),
    };
    let n_classes = match view {
        TargetView::Classes { n_classes, .. } => n_classes,
        TargetView::Values(_) => 0,
    };

    let draw_count = ((n_samples as f64) * sample_fraction).ceil() as usize;

    // In holdout mode, every tree evaluates importance on the zero-weight
    // samples; otherwise each tree uses its own out-of-bag indices.
    let holdout_indices: Option<Vec<usize>> = if config.holdout {
        config.case_weights.as_ref().map(|w| {
            (0..n_samples).filter(|&i| w[i] == 0.0).collect()
        })
    } else {
        None
    };

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        mtry,
        draw_count,
        replace = config.replace,
        holdout = config.holdout,
        %task,
        "training forest"
    );

    // Per-tree seeds from the master RNG.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let case_weights = config.case_weights.as_deref();
    let replace = config.replace;
    let min_node_size = config.min_node_size;

    let build_trees = || -> Vec<(Tree, Vec<usize>)> {
        tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let sample = draw_sample(n_samples, draw_count, case_weights, replace, &mut rng);
                let tree = Tree::grow(
                    features,
                    &view,
                    &sample.drawn,
                    mtry,
                    min_node_size,
                    &mut rng,
                );
                let eval_indices = match &holdout_indices {
                    Some(h) => h.clone(),
                    None => sample.oob_indices(),
                };
                (tree, eval_indices)
            })
            .collect()
    };

    let tree_results = match config.n_threads {
        Some(n_threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build()
                .map_err(|source| ForestError::ThreadPool { source })?;
            pool.install(build_trees)
        }
        None => build_trees(),
    };

    let mut trees = Vec::with_capacity(config.n_trees);
    let mut eval_indices_per_tree = Vec::with_capacity(config.n_trees);
    for (tree, eval) in tree_results {
        trees.push(tree);
        eval_indices_per_tree.push(eval);
    }

    debug!(n_trees_trained = trees.len(), "tree training complete");

    let importance = match config.importance {
        ImportanceMode::Permutation => Some(compute_permutation_importance(
            &trees,
            features,
            &view,
            &eval_indices_per_tree,
            config.seed,
        )),
        ImportanceMode::None => None,
    };

    info!("forest training complete");

    Ok(ForestFit {
        forest: Forest {
            trees,
            n_features,
            n_classes,
            task,
        },
        importance,
    })
}
