use calluna_forest::ForestError;

use crate::model::Task;

/// Errors from variable selection and model evaluation.
#[derive(Debug, thiserror::Error)]
pub enum VitaError {
    /// Returned when the outcome length differs from the table's row count,
    /// or a row has the wrong number of columns.
    #[error("dimension mismatch: expected {expected} entries, got {got}")]
    DimensionMismatch {
        /// The expected entry count.
        expected: usize,
        /// The actual entry count provided.
        got: usize,
    },

    /// Returned when the feature table contains a missing value.
    #[error("missing value at row {row}, column '{column}'")]
    InvalidInput {
        /// The zero-based row index of the missing cell.
        row: usize,
        /// The name of the column holding the missing cell.
        column: String,
    },

    /// Returned when a categorical outcome is supplied to a numeric-only task.
    #[error("task '{task}' requires a numeric outcome")]
    TypeMismatch {
        /// The task that rejected the outcome.
        task: Task,
    },

    /// Returned when an unrecognized training backend is requested.
    #[error("unsupported training backend '{method}'")]
    UnsupportedMethod {
        /// The backend name that was requested.
        method: String,
    },

    /// A failure inside the forest engine, propagated unchanged.
    #[error(transparent)]
    Engine(#[from] ForestError),

    /// Returned when rendering the confusion-matrix plot fails.
    #[error("failed to render confusion plot: {message}")]
    Plot {
        /// Description of the underlying drawing failure.
        message: String,
    },
}
