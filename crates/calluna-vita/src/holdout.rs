//! The Janitza et al. (2015) holdout procedure: two forests on
//! complementary sample folds, each scoring importance on the fold it never
//! saw.

use calluna_forest::ImportanceMode;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::error::VitaError;
use crate::model::{FittedForest, FittedModel, ModelConfig, NativeEngine, Task, TrainableForest};
use crate::table::{FeatureTable, Outcome};

/// Result of holdout training: both fold models and the averaged importance.
#[derive(Debug)]
pub struct HoldoutForest<F = FittedModel> {
    /// The model trained on fold A.
    pub model_a: F,
    /// The model trained on fold B (the complement of fold A).
    pub model_b: F,
    importance: Vec<f64>,
    task: Task,
    importance_mode: ImportanceMode,
}

impl<F> HoldoutForest<F> {
    /// Per-variable importance: the mean of the two fold models' scores.
    #[must_use]
    pub fn importance(&self) -> &[f64] {
        &self.importance
    }

    /// Return the task both fold models were trained for.
    #[must_use]
    pub fn task(&self) -> Task {
        self.task
    }

    /// Return the importance mode both fold models used.
    #[must_use]
    pub fn importance_mode(&self) -> ImportanceMode {
        self.importance_mode
    }
}

/// Draw one fair coin per sample, producing complementary 0/1 weight
/// vectors: `w[i] + complement[i] == 1.0` for every sample.
pub(crate) fn fold_weights(n_samples: usize, rng: &mut ChaCha8Rng) -> (Vec<f64>, Vec<f64>) {
    let w: Vec<f64> = (0..n_samples)
        .map(|_| if rng.r#gen::<bool>() { 1.0 } else { 0.0 })
        .collect();
    let complement = w.iter().map(|&v| 1.0 - v).collect();
    (w, complement)
}

/// Train a holdout forest with the native engine.
///
/// # Errors
///
/// See [`holdout_forest_with`].
pub fn holdout_forest(
    config: &ModelConfig,
    x: &FeatureTable,
    y: &Outcome,
) -> Result<HoldoutForest, VitaError> {
    holdout_forest_with(&NativeEngine, config, x, y)
}

/// Train a holdout forest through an arbitrary [`TrainableForest`] engine.
///
/// A fair coin per sample assigns each sample to fold A or fold B. Both
/// models train without replacement in holdout mode, so each evaluates
/// permutation importance only on the samples the other fold kept. The
/// returned importance is the element-wise mean of the two fold scores.
///
/// Either fold's training failure propagates unchanged: a single failed
/// fold invalidates the whole holdout estimate.
///
/// # Errors
///
/// Any error from [`crate::train_forest`] via the engine.
#[instrument(skip_all, fields(n_rows = x.n_rows(), n_cols = x.n_cols()))]
pub fn holdout_forest_with<E: TrainableForest>(
    engine: &E,
    config: &ModelConfig,
    x: &FeatureTable,
    y: &Outcome,
) -> Result<HoldoutForest<E::Fitted>, VitaError> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed());
    let (weights_a, weights_b) = fold_weights(x.n_rows(), &mut rng);
    let seed_a: u64 = rng.r#gen();
    let seed_b: u64 = rng.r#gen();

    // Both folds inherit the caller's config; holdout mode and
    // without-replacement sampling are what make the procedure unbiased.
    let fold_config = |weights: Vec<f64>, seed: u64| {
        config
            .clone()
            .with_case_weights(Some(weights))
            .with_holdout(true)
            .with_replace(false)
            .with_importance(ImportanceMode::Permutation)
            .with_seed(seed)
    };

    let fold_a = fold_weights_count(&weights_a);
    info!(fold_a, fold_b = x.n_rows() - fold_a, "holdout folds drawn");

    let model_a = engine.train(&fold_config(weights_a, seed_a), x, y)?;
    let model_b = engine.train(&fold_config(weights_b, seed_b), x, y)?;

    let importance: Vec<f64> = model_a
        .importance()
        .iter()
        .zip(model_b.importance().iter())
        .map(|(&a, &b)| (a + b) / 2.0)
        .collect();

    Ok(HoldoutForest {
        model_a,
        model_b,
        importance,
        task: config.task(),
        importance_mode: ImportanceMode::Permutation,
    })
}

fn fold_weights_count(weights: &[f64]) -> usize {
    weights.iter().filter(|&&w| w > 0.0).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn fold_weights_are_complementary() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let (a, b) = fold_weights(200, &mut rng);
        assert_eq!(a.len(), 200);
        for (wa, wb) in a.iter().zip(b.iter()) {
            assert_eq!(wa + wb, 1.0);
            assert!(*wa == 0.0 || *wa == 1.0);
        }
    }

    #[test]
    fn fold_weights_deterministic_per_seed() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(7);
        let mut rng2 = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(fold_weights(50, &mut rng1).0, fold_weights(50, &mut rng2).0);
    }

    /// Stub engine recording the weights it was trained with and returning
    /// canned importance scores.
    struct StubEngine {
        importances: RefCell<Vec<Vec<f64>>>,
        seen_weights: RefCell<Vec<Vec<f64>>>,
    }

    #[derive(Debug)]
    struct StubFit {
        importance: Vec<f64>,
    }

    impl FittedForest for StubFit {
        fn importance(&self) -> &[f64] {
            &self.importance
        }
    }

    impl TrainableForest for StubEngine {
        type Fitted = StubFit;

        fn train(
            &self,
            config: &ModelConfig,
            _x: &FeatureTable,
            _y: &Outcome,
        ) -> Result<StubFit, VitaError> {
            assert!(config.holdout);
            assert!(!config.replace);
            self.seen_weights
                .borrow_mut()
                .push(config.case_weights.clone().unwrap());
            Ok(StubFit {
                importance: self.importances.borrow_mut().remove(0),
            })
        }
    }

    fn stub_inputs() -> (FeatureTable, Outcome) {
        let x = FeatureTable::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            (0..10).map(|i| vec![i as f64, 0.0, 1.0]).collect(),
        )
        .unwrap();
        let y = Outcome::Numeric((0..10).map(|i| (i % 2) as f64).collect());
        (x, y)
    }

    #[test]
    fn averaged_importance_is_exact_mean_of_folds() {
        let engine = StubEngine {
            importances: RefCell::new(vec![vec![0.4, -0.2, 0.0], vec![0.2, 0.2, 0.1]]),
            seen_weights: RefCell::new(Vec::new()),
        };
        let (x, y) = stub_inputs();
        let holdout =
            holdout_forest_with(&engine, &ModelConfig::new().with_seed(42), &x, &y).unwrap();

        let expected = [0.3, 0.0, 0.05];
        for (got, want) in holdout.importance().iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-15, "got {got}, want {want}");
        }
    }

    #[test]
    fn fold_models_receive_complementary_weights() {
        let engine = StubEngine {
            importances: RefCell::new(vec![vec![0.0; 3], vec![0.0; 3]]),
            seen_weights: RefCell::new(Vec::new()),
        };
        let (x, y) = stub_inputs();
        holdout_forest_with(&engine, &ModelConfig::new().with_seed(9), &x, &y).unwrap();

        let seen = engine.seen_weights.borrow();
        assert_eq!(seen.len(), 2);
        for (wa, wb) in seen[0].iter().zip(seen[1].iter()) {
            assert_eq!(wa + wb, 1.0);
        }
    }

    #[test]
    fn fold_failure_propagates() {
        struct FailingEngine;
        impl TrainableForest for FailingEngine {
            type Fitted = StubFit;
            fn train(
                &self,
                _config: &ModelConfig,
                _x: &FeatureTable,
                _y: &Outcome,
            ) -> Result<StubFit, VitaError> {
                Err(VitaError::UnsupportedMethod {
                    method: "stub".to_string(),
                })
            }
        }
        let (x, y) = stub_inputs();
        let err = holdout_forest_with(&FailingEngine, &ModelConfig::new(), &x, &y).unwrap_err();
        assert!(matches!(err, VitaError::UnsupportedMethod { .. }));
    }
}
