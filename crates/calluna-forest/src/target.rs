//! Training target representations.

/// The outcome a forest is trained against.
#[derive(Debug, Clone)]
pub enum Target {
    /// Zero-based class labels for classification forests.
    Classes(Vec<usize>),
    /// Continuous values for regression forests.
    Values(Vec<f64>),
}

impl Target {
    /// Return the number of target entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Target::Classes(labels) => labels.len(),
            Target::Values(values) => values.len(),
        }
    }

    /// Return `true` when the target holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Borrowed view of a target, carrying the derived class count.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TargetView<'a> {
    Classes {
        labels: &'a [usize],
        n_classes: usize,
    },
    Values(&'a [f64]),
}
