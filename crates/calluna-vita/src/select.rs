//! Vita variable selection: empirical-null p-values over holdout importance.

use calluna_forest::{ImportanceTest, janitza_pvalues};
use tracing::{info, instrument};

use crate::error::VitaError;
use crate::holdout::{HoldoutForest, holdout_forest_with};
use crate::model::{FittedForest, ModelConfig, NativeEngine, TrainableForest};
use crate::table::{FeatureTable, Outcome};

/// Configuration for Vita selection.
///
/// Construct via [`VitaConfig::new`], then chain `with_*` methods.
#[derive(Debug, Clone)]
pub struct VitaConfig {
    model: ModelConfig,
    p_threshold: f64,
    conf_level: f64,
}

impl VitaConfig {
    /// Create a selection config around a model config.
    ///
    /// Defaults: `p_threshold` 0.05, `conf_level` 0.95.
    #[must_use]
    pub fn new(model: ModelConfig) -> Self {
        Self {
            model,
            p_threshold: 0.05,
            conf_level: 0.95,
        }
    }

    /// Set the selection p-value threshold.
    #[must_use]
    pub fn with_p_threshold(mut self, p_threshold: f64) -> Self {
        self.p_threshold = p_threshold;
        self
    }

    /// Set the confidence level for the importance bounds.
    #[must_use]
    pub fn with_conf_level(mut self, conf_level: f64) -> Self {
        self.conf_level = conf_level;
        self
    }

    /// Return the model config.
    #[must_use]
    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Return the selection p-value threshold.
    #[must_use]
    pub fn p_threshold(&self) -> f64 {
        self.p_threshold
    }

    /// Return the confidence level.
    #[must_use]
    pub fn conf_level(&self) -> f64 {
        self.conf_level
    }
}

impl Default for VitaConfig {
    fn default() -> Self {
        Self::new(ModelConfig::new())
    }
}

/// One row of the selection report.
#[derive(Debug, Clone)]
pub struct VariableReport {
    /// The variable (column) name.
    pub name: String,
    /// Averaged holdout importance.
    pub importance: f64,
    /// Lower confidence bound on the importance.
    pub ci_lower: f64,
    /// Upper confidence bound on the importance.
    pub ci_upper: f64,
    /// One-sided p-value under the empirical null.
    pub pvalue: f64,
    /// Whether the variable passed the selection rule.
    pub selected: bool,
}

/// The terminal artifact of Vita selection.
#[derive(Debug, Clone)]
pub struct SelectionReport {
    variables: Vec<VariableReport>,
}

impl SelectionReport {
    /// Return the per-variable rows, in table column order.
    #[must_use]
    pub fn variables(&self) -> &[VariableReport] {
        &self.variables
    }

    /// Return the selected variable names, lexicographically sorted and
    /// deduplicated.
    #[must_use]
    pub fn selected_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .variables
            .iter()
            .filter(|v| v.selected)
            .map(|v| v.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// The empirical-null testing capability the selector depends on.
pub trait EmpiricalNullTester {
    /// Derive per-variable importance, confidence bounds, and p-values from
    /// a holdout-trained forest.
    fn test<F: FittedForest>(
        &self,
        holdout: &HoldoutForest<F>,
        conf_level: f64,
    ) -> Result<Vec<ImportanceTest>, VitaError>;
}

/// The engine's Janitza routine.
#[derive(Debug, Clone, Copy, Default)]
pub struct JanitzaTester;

impl EmpiricalNullTester for JanitzaTester {
    fn test<F: FittedForest>(
        &self,
        holdout: &HoldoutForest<F>,
        conf_level: f64,
    ) -> Result<Vec<ImportanceTest>, VitaError> {
        Ok(janitza_pvalues(holdout.importance(), conf_level)?)
    }
}

/// The selection rule.
///
/// A p-value of exactly zero is selected even when the threshold is zero;
/// otherwise selection requires `pvalue < threshold` strictly.
fn is_selected(pvalue: f64, threshold: f64) -> bool {
    pvalue == 0.0 || pvalue < threshold
}

/// Run Vita selection with the native engine and the Janitza tester.
///
/// # Errors
///
/// See [`vita_selection_with`].
pub fn vita_selection(
    config: &VitaConfig,
    x: &FeatureTable,
    y: &Outcome,
) -> Result<SelectionReport, VitaError> {
    vita_selection_with(&NativeEngine, &JanitzaTester, config, x, y)
}

/// Run Vita selection through arbitrary engine and tester capabilities.
///
/// Trains the holdout forest, derives empirical-null p-values from the
/// averaged importance, and applies the selection rule per variable.
///
/// # Errors
///
/// Any error from the holdout trainer or the tester, propagated unchanged.
#[instrument(skip_all, fields(n_cols = x.n_cols(), p_threshold = config.p_threshold))]
pub fn vita_selection_with<E, T>(
    engine: &E,
    tester: &T,
    config: &VitaConfig,
    x: &FeatureTable,
    y: &Outcome,
) -> Result<SelectionReport, VitaError>
where
    E: TrainableForest,
    T: EmpiricalNullTester,
{
    let holdout = holdout_forest_with(engine, &config.model, x, y)?;
    let tests = tester.test(&holdout, config.conf_level)?;

    let variables: Vec<VariableReport> = x
        .names()
        .iter()
        .zip(tests.into_iter())
        .map(|(name, t)| VariableReport {
            name: name.clone(),
            importance: t.importance,
            ci_lower: t.ci_lower,
            ci_upper: t.ci_upper,
            pvalue: t.pvalue,
            selected: is_selected(t.pvalue, config.p_threshold),
        })
        .collect();

    let n_selected = variables.iter().filter(|v| v.selected).count();
    info!(n_selected, n_total = variables.len(), "vita selection complete");

    Ok(SelectionReport { variables })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holdout::holdout_forest_with;
    use std::cell::RefCell;

    #[test]
    fn zero_pvalue_always_selected() {
        assert!(is_selected(0.0, 0.05));
        assert!(is_selected(0.0, 0.0));
    }

    #[test]
    fn threshold_is_strict() {
        assert!(!is_selected(0.05, 0.05));
        assert!(is_selected(0.049, 0.05));
        assert!(!is_selected(0.2, 0.05));
    }

    /// Engine returning fixed importances so the tester sees a known input.
    struct CannedEngine {
        importances: RefCell<Vec<Vec<f64>>>,
    }

    struct CannedFit {
        importance: Vec<f64>,
    }

    impl FittedForest for CannedFit {
        fn importance(&self) -> &[f64] {
            &self.importance
        }
    }

    impl TrainableForest for CannedEngine {
        type Fitted = CannedFit;
        fn train(
            &self,
            _config: &ModelConfig,
            _x: &FeatureTable,
            _y: &Outcome,
        ) -> Result<CannedFit, VitaError> {
            Ok(CannedFit {
                importance: self.importances.borrow_mut().remove(0),
            })
        }
    }

    /// Tester assigning a fixed p-value per variable.
    struct CannedTester {
        pvalues: Vec<f64>,
    }

    impl EmpiricalNullTester for CannedTester {
        fn test<F: FittedForest>(
            &self,
            holdout: &HoldoutForest<F>,
            _conf_level: f64,
        ) -> Result<Vec<ImportanceTest>, VitaError> {
            Ok(holdout
                .importance()
                .iter()
                .zip(self.pvalues.iter())
                .map(|(&importance, &pvalue)| ImportanceTest {
                    importance,
                    ci_lower: importance - 0.1,
                    ci_upper: importance + 0.1,
                    pvalue,
                })
                .collect())
        }
    }

    fn inputs() -> (FeatureTable, Outcome) {
        let x = FeatureTable::new(
            vec!["zeta".to_string(), "alpha".to_string(), "mid".to_string()],
            (0..8).map(|i| vec![i as f64, 1.0, 2.0]).collect(),
        )
        .unwrap();
        let y = Outcome::Numeric((0..8).map(|i| (i % 2) as f64).collect());
        (x, y)
    }

    #[test]
    fn selected_names_sorted_lexicographically() {
        let engine = CannedEngine {
            importances: RefCell::new(vec![vec![0.5, 0.4, 0.0], vec![0.5, 0.4, 0.0]]),
        };
        let tester = CannedTester {
            pvalues: vec![0.0, 0.01, 0.9],
        };
        let (x, y) = inputs();
        let config = VitaConfig::default();
        let report = vita_selection_with(&engine, &tester, &config, &x, &y).unwrap();

        assert_eq!(report.selected_names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn report_preserves_column_order() {
        let engine = CannedEngine {
            importances: RefCell::new(vec![vec![0.1, 0.2, 0.3], vec![0.1, 0.2, 0.3]]),
        };
        let tester = CannedTester {
            pvalues: vec![0.5, 0.5, 0.5],
        };
        let (x, y) = inputs();
        let report =
            vita_selection_with(&engine, &tester, &VitaConfig::default(), &x, &y).unwrap();

        let names: Vec<&str> = report.variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        assert!(report.variables().iter().all(|v| !v.selected));
    }

    #[test]
    fn zero_threshold_still_selects_zero_pvalues() {
        let engine = CannedEngine {
            importances: RefCell::new(vec![vec![0.9, 0.0, 0.0], vec![0.9, 0.0, 0.0]]),
        };
        let tester = CannedTester {
            pvalues: vec![0.0, 0.001, 0.8],
        };
        let (x, y) = inputs();
        let config = VitaConfig::default().with_p_threshold(0.0);
        let report = vita_selection_with(&engine, &tester, &config, &x, &y).unwrap();

        assert_eq!(report.selected_names(), vec!["zeta"]);
    }

    #[test]
    fn janitza_tester_reads_holdout_importance() {
        // Importance vector with a clear null component so the engine's
        // Janitza routine succeeds on it.
        let scores = vec![0.6, -0.01, 0.004, -0.006, 0.0, 0.002];
        let x = FeatureTable::new(
            (0..6).map(|i| format!("v{i}")).collect(),
            (0..8).map(|i| vec![i as f64; 6]).collect(),
        )
        .unwrap();
        let y = Outcome::Numeric((0..8).map(|i| (i % 2) as f64).collect());
        let engine = CannedEngine {
            importances: RefCell::new(vec![scores.clone(), scores.clone()]),
        };
        let holdout =
            holdout_forest_with(&engine, &ModelConfig::new().with_seed(3), &x, &y).unwrap();
        let tests = JanitzaTester.test(&holdout, 0.95).unwrap();

        assert_eq!(tests.len(), 6);
        assert_eq!(tests[0].pvalue, 0.0);
    }
}
