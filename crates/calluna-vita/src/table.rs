//! Feature table and outcome representations.

use crate::error::VitaError;

/// A rectangular table of numeric predictor values.
///
/// Rows are samples, columns are named variables. A `NaN` cell encodes a
/// missing value; training rejects tables containing any.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Create a table from column names and row-major values.
    ///
    /// # Errors
    ///
    /// Returns [`VitaError::DimensionMismatch`] when any row's length
    /// differs from the number of column names.
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, VitaError> {
        for row in &rows {
            if row.len() != names.len() {
                return Err(VitaError::DimensionMismatch {
                    expected: names.len(),
                    got: row.len(),
                });
            }
        }
        Ok(Self { names, rows })
    }

    /// Return the number of samples.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of variables.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    /// Return the column names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the row-major values.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Fail with [`VitaError::InvalidInput`] on the first missing
    /// (non-finite) cell, naming its row and column.
    pub(crate) fn check_no_missing(&self) -> Result<(), VitaError> {
        for (row_idx, row) in self.rows.iter().enumerate() {
            for (col_idx, &val) in row.iter().enumerate() {
                if !val.is_finite() {
                    return Err(VitaError::InvalidInput {
                        row: row_idx,
                        column: self.names[col_idx].clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The outcome variable, one entry per sample.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Continuous or label-encoded numeric outcome.
    Numeric(Vec<f64>),
    /// Categorical outcome holding one label per sample.
    Categorical(Vec<String>),
}

impl Outcome {
    /// Return the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Outcome::Numeric(values) => values.len(),
            Outcome::Categorical(labels) => labels.len(),
        }
    }

    /// Return `true` when the outcome holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_rows_rejected() {
        let err = FeatureTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0], vec![3.0]],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VitaError::DimensionMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn missing_cell_named_by_row_and_column() {
        let table = FeatureTable::new(
            vec!["x".to_string(), "y".to_string()],
            vec![vec![1.0, 2.0], vec![3.0, f64::NAN]],
        )
        .unwrap();
        let err = table.check_no_missing().unwrap_err();
        match err {
            VitaError::InvalidInput { row, column } => {
                assert_eq!(row, 1);
                assert_eq!(column, "y");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn clean_table_passes() {
        let table = FeatureTable::new(
            vec!["x".to_string()],
            vec![vec![1.0], vec![2.0]],
        )
        .unwrap();
        assert!(table.check_no_missing().is_ok());
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.n_cols(), 1);
    }
}
