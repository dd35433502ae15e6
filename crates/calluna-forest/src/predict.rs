//! Prediction methods for the fitted forest.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::ForestError;
use crate::forest::{Forest, TaskKind};
use crate::tree::{LeafValue, argmax};

impl Forest {
    /// Predict the class label for a single sample.
    ///
    /// Returns the argmax of the averaged leaf distributions.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::TaskMismatch`] | forest was trained for regression |
    /// | [`ForestError::PredictionFeatureMismatch`] | wrong feature count |
    pub fn predict_class(&self, sample: &[f64]) -> Result<usize, ForestError> {
        Ok(argmax(&self.predict_proba(sample)?))
    }

    /// Return the averaged class probability distribution for a single sample.
    ///
    /// # Errors
    ///
    /// Same as [`Forest::predict_class`].
    pub fn predict_proba(&self, sample: &[f64]) -> Result<Vec<f64>, ForestError> {
        self.check_task(TaskKind::Classification)?;
        self.check_width(sample)?;

        let mut avg = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            if let LeafValue::Distribution(dist) = tree.leaf(sample) {
                for (slot, p) in avg.iter_mut().zip(dist.iter()) {
                    *slot += p;
                }
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);
        Ok(avg)
    }

    /// Predict the continuous value for a single sample (mean over trees).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::TaskMismatch`] | forest was trained for classification |
    /// | [`ForestError::PredictionFeatureMismatch`] | wrong feature count |
    pub fn predict_value(&self, sample: &[f64]) -> Result<f64, ForestError> {
        self.check_task(TaskKind::Regression)?;
        self.check_width(sample)?;

        let sum: f64 = self.trees.iter().map(|t| t.predict_value(sample)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// Predict class labels for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Same as [`Forest::predict_class`], for any offending sample.
    pub fn predict_class_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, ForestError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_class(sample))
            .collect()
    }

    /// Probability distributions for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Same as [`Forest::predict_proba`], for any offending sample.
    pub fn predict_proba_batch(
        &self,
        features: &[Vec<f64>],
    ) -> Result<Vec<Vec<f64>>, ForestError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Continuous predictions for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Same as [`Forest::predict_value`], for any offending sample.
    pub fn predict_value_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ForestError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_value(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes (0 for regression forests).
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the task kind this forest was trained for.
    #[must_use]
    pub fn task(&self) -> TaskKind {
        self.task
    }

    fn check_task(&self, expected: TaskKind) -> Result<(), ForestError> {
        if self.task != expected {
            return Err(ForestError::TaskMismatch {
                expected,
                found: self.task,
            });
        }
        Ok(())
    }

    fn check_width(&self, sample: &[f64]) -> Result<(), ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }
}
