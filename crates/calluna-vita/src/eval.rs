//! Accuracy and agreement statistics for a fitted model on labeled data.

use tracing::{info, instrument};

use crate::error::VitaError;
use crate::model::FittedModel;
use crate::plot::ConfusionPlot;
use crate::table::{FeatureTable, Outcome};

/// Observed-versus-predicted label counts.
///
/// Entry `as_rows()[observed][predicted]` counts how many samples with the
/// observed level were predicted as the predicted level. Levels are the
/// sorted union of both label sets.
#[derive(Debug, Clone)]
pub struct ContingencyTable {
    levels: Vec<String>,
    counts: Vec<Vec<usize>>,
}

impl ContingencyTable {
    /// Cross-tabulate observed and predicted labels.
    ///
    /// # Errors
    ///
    /// Returns [`VitaError::DimensionMismatch`] when the slices differ in
    /// length.
    pub fn from_labels(observed: &[String], predicted: &[String]) -> Result<Self, VitaError> {
        if observed.len() != predicted.len() {
            return Err(VitaError::DimensionMismatch {
                expected: observed.len(),
                got: predicted.len(),
            });
        }

        let mut levels: Vec<String> = observed.iter().chain(predicted.iter()).cloned().collect();
        levels.sort();
        levels.dedup();

        let n = levels.len();
        let mut counts = vec![vec![0usize; n]; n];
        for (obs, pred) in observed.iter().zip(predicted.iter()) {
            let i = levels.binary_search(obs).expect("level from union");
            let j = levels.binary_search(pred).expect("level from union");
            counts[i][j] += 1;
        }

        Ok(Self { levels, counts })
    }

    /// Return the level names, in sorted order.
    #[must_use]
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Return the count matrix rows (observed outer, predicted inner).
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.counts
    }

    /// Overall accuracy: the diagonal sum over the total count.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.levels.len()).map(|i| self.counts[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Cohen's kappa: chance-corrected agreement from the marginals.
    #[must_use]
    pub fn kappa(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let n = self.levels.len();
        let total_f = total as f64;

        let expected: f64 = (0..n)
            .map(|i| {
                let row: usize = self.counts[i].iter().sum();
                let col: usize = (0..n).map(|j| self.counts[j][i]).sum();
                (row as f64 / total_f) * (col as f64 / total_f)
            })
            .sum();

        let observed = self.accuracy();
        if (1.0 - expected).abs() < f64::EPSILON {
            0.0
        } else {
            (observed - expected) / (1.0 - expected)
        }
    }

    fn total(&self) -> usize {
        self.counts.iter().flat_map(|row| row.iter()).sum()
    }
}

/// Evaluation of a fitted model against known labels.
#[derive(Debug, Clone)]
pub struct Evaluation {
    table: ContingencyTable,
}

impl Evaluation {
    /// Return the observed-versus-predicted contingency table.
    #[must_use]
    pub fn table(&self) -> &ContingencyTable {
        &self.table
    }

    /// Return the overall accuracy.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.table.accuracy()
    }

    /// Return Cohen's kappa.
    #[must_use]
    pub fn kappa(&self) -> f64 {
        self.table.kappa()
    }

    /// Build the confusion-matrix plot for this evaluation.
    ///
    /// The plot renders on demand; no file is written here.
    #[must_use]
    pub fn plot(&self, title: Option<&str>) -> ConfusionPlot {
        ConfusionPlot::new(
            self.table.clone(),
            self.accuracy(),
            self.kappa(),
            title.map(str::to_string),
        )
    }
}

/// Score a fitted model's predictions on new data against known labels.
///
/// Numeric outcomes are rendered as level labels the same way training
/// coerces them, so a model trained on a coerced outcome evaluates cleanly.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`VitaError::DimensionMismatch`] | outcome length != row count |
/// | [`VitaError::InvalidInput`] | the table contains a missing value |
/// | [`VitaError::Engine`] | prediction failure (e.g. a regression model) |
#[instrument(skip_all, fields(n_rows = x.n_rows()))]
pub fn evaluate(
    model: &FittedModel,
    x: &FeatureTable,
    y: &Outcome,
) -> Result<Evaluation, VitaError> {
    if y.len() != x.n_rows() {
        return Err(VitaError::DimensionMismatch {
            expected: x.n_rows(),
            got: y.len(),
        });
    }

    let observed = match y {
        Outcome::Categorical(labels) => labels.clone(),
        Outcome::Numeric(values) => values
            .iter()
            .map(|&v| crate::model::numeric_label(v))
            .collect(),
    };
    let predicted = model.predict_labels(x)?;

    let table = ContingencyTable::from_labels(&observed, &predicted)?;
    let evaluation = Evaluation { table };
    info!(
        accuracy = evaluation.accuracy(),
        kappa = evaluation.kappa(),
        "evaluation complete"
    );
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build label vectors realizing a known 2x2 contingency table.
    fn known_labels() -> (Vec<String>, Vec<String>) {
        let mut observed = Vec::new();
        let mut predicted = Vec::new();
        // Observed rows, predicted columns: [[8, 2], [1, 9]].
        let cells = [("a", "a", 8), ("a", "b", 2), ("b", "a", 1), ("b", "b", 9)];
        for (obs, pred, count) in cells {
            for _ in 0..count {
                observed.push(obs.to_string());
                predicted.push(pred.to_string());
            }
        }
        (observed, predicted)
    }

    #[test]
    fn known_table_accuracy_exact() {
        let (observed, predicted) = known_labels();
        let table = ContingencyTable::from_labels(&observed, &predicted).unwrap();
        assert_eq!(table.as_rows(), &[vec![8, 2], vec![1, 9]]);
        assert!((table.accuracy() - 0.85).abs() < 1e-15);
    }

    #[test]
    fn known_table_kappa_exact() {
        let (observed, predicted) = known_labels();
        let table = ContingencyTable::from_labels(&observed, &predicted).unwrap();
        // po = 0.85, pe = (10*9 + 10*11) / 400 = 0.5 -> kappa = 0.7.
        assert!((table.kappa() - 0.7).abs() < 1e-12, "kappa = {}", table.kappa());
    }

    #[test]
    fn perfect_agreement_kappa_one() {
        let labels: Vec<String> = ["x", "y", "x", "y"].iter().map(|s| s.to_string()).collect();
        let table = ContingencyTable::from_labels(&labels, &labels).unwrap();
        assert!((table.accuracy() - 1.0).abs() < f64::EPSILON);
        assert!((table.kappa() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn level_union_covers_unseen_predictions() {
        let observed = vec!["a".to_string(), "a".to_string()];
        let predicted = vec!["a".to_string(), "c".to_string()];
        let table = ContingencyTable::from_labels(&observed, &predicted).unwrap();
        assert_eq!(table.levels(), ["a", "c"]);
        assert!((table.accuracy() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = ContingencyTable::from_labels(&["a".to_string()], &[]).unwrap_err();
        assert!(matches!(
            err,
            VitaError::DimensionMismatch { expected: 1, got: 0 }
        ));
    }

    #[test]
    fn end_to_end_separable_accuracy() {
        use crate::model::ModelConfig;
        use crate::table::{FeatureTable, Outcome};

        let x = FeatureTable::new(
            vec!["f".to_string()],
            (0..20)
                .map(|i| vec![if i < 10 { i as f64 } else { 50.0 + i as f64 }])
                .collect(),
        )
        .unwrap();
        let y = Outcome::Categorical(
            (0..20)
                .map(|i| if i < 10 { "low" } else { "high" })
                .map(str::to_string)
                .collect(),
        );
        let model = ModelConfig::new()
            .with_n_trees(25)
            .with_mtry_prop(1.0)
            .with_seed(42)
            .train(&x, &y)
            .unwrap();
        let evaluation = evaluate(&model, &x, &y).unwrap();
        assert!(evaluation.accuracy() > 0.9, "accuracy = {}", evaluation.accuracy());
    }
}
