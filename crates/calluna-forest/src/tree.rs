//! Arena-based CART trees for classification and regression.

use rand_chacha::ChaCha8Rng;

use crate::split::find_best_split;
use crate::target::TargetView;

/// What a leaf predicts.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) enum LeafValue {
    /// Normalized class distribution (classification).
    Distribution(Vec<f64>),
    /// Mean of the target values (regression).
    Mean(f64),
}

/// A tree node in the arena.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) enum Node {
    Leaf {
        value: LeafValue,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree.
///
/// Nodes live in a `Vec` arena with index references; the root is index 0.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Grow a tree on the given samples.
    ///
    /// `indices` are the (possibly repeated) sample indices drawn for this
    /// tree. Nodes stop splitting when they are pure, at or below
    /// `min_node_size`, or when no candidate split improves impurity.
    pub(crate) fn grow(
        rows: &[Vec<f64>],
        target: &TargetView<'_>,
        indices: &[usize],
        mtry: usize,
        min_node_size: usize,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut nodes = Vec::new();
        grow_node(rows, target, indices, mtry, min_node_size, rng, &mut nodes);
        Self { nodes }
    }

    /// Return the leaf value reached by `sample`.
    pub(crate) fn leaf(&self, sample: &[f64]) -> &LeafValue {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value, .. } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Predicted class for a single sample (argmax of the leaf distribution).
    ///
    /// Only meaningful for classification trees.
    pub(crate) fn predict_class(&self, sample: &[f64]) -> usize {
        match self.leaf(sample) {
            LeafValue::Distribution(dist) => argmax(dist),
            LeafValue::Mean(_) => 0,
        }
    }

    /// Predicted value for a single sample (leaf mean).
    ///
    /// Only meaningful for regression trees.
    pub(crate) fn predict_value(&self, sample: &[f64]) -> f64 {
        match self.leaf(sample) {
            LeafValue::Mean(mean) => *mean,
            LeafValue::Distribution(dist) => argmax(dist) as f64,
        }
    }

    /// Return the total number of nodes.
    #[cfg(test)]
    pub(crate) fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// Index of the largest value, ties broken toward the lower index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Recursively grow one node, returning its arena index.
fn grow_node(
    rows: &[Vec<f64>],
    target: &TargetView<'_>,
    indices: &[usize],
    mtry: usize,
    min_node_size: usize,
    rng: &mut ChaCha8Rng,
    arena: &mut Vec<Node>,
) -> usize {
    let n_samples = indices.len();

    let make_leaf = |arena: &mut Vec<Node>| -> usize {
        let value = leaf_value(target, indices);
        let idx = arena.len();
        arena.push(Node::Leaf { value, n_samples });
        idx
    };

    if n_samples <= min_node_size {
        return make_leaf(arena);
    }

    let split = match find_best_split(rows, target, indices, mtry, rng) {
        Some(s) => s,
        None => return make_leaf(arena),
    };

    // Arena pattern: reserve the index, recurse, then overwrite with the split.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        value: LeafValue::Mean(0.0),
        n_samples,
    });

    let left = grow_node(rows, target, &split.left, mtry, min_node_size, rng, arena);
    let right = grow_node(rows, target, &split.right, mtry, min_node_size, rng, arena);

    arena[node_idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
    };

    node_idx
}

/// Build the leaf value for the samples reaching a terminal node.
fn leaf_value(target: &TargetView<'_>, indices: &[usize]) -> LeafValue {
    match target {
        TargetView::Classes { labels, n_classes } => {
            let mut counts = vec![0usize; *n_classes];
            for &i in indices {
                counts[labels[i]] += 1;
            }
            let total = indices.len() as f64;
            LeafValue::Distribution(counts.iter().map(|&c| c as f64 / total).collect())
        }
        TargetView::Values(values) => {
            let mean = indices.iter().map(|&i| values[i]).sum::<f64>() / indices.len() as f64;
            LeafValue::Mean(mean)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn pure_labels_build_single_leaf() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![0, 0, 0];
        let target = TargetView::Classes {
            labels: &labels,
            n_classes: 1,
        };
        let indices: Vec<usize> = (0..3).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let tree = Tree::grow(&rows, &target, &indices, 1, 1, &mut rng);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict_class(&[2.0]), 0);
    }

    #[test]
    fn separable_labels_predicted_correctly() {
        let rows = vec![
            vec![1.0],
            vec![2.0],
            vec![3.0],
            vec![10.0],
            vec![11.0],
            vec![12.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let target = TargetView::Classes {
            labels: &labels,
            n_classes: 2,
        };
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let tree = Tree::grow(&rows, &target, &indices, 1, 1, &mut rng);
        assert_eq!(tree.predict_class(&[2.5]), 0);
        assert_eq!(tree.predict_class(&[10.5]), 1);
    }

    #[test]
    fn regression_leaf_means_bracket_targets() {
        let rows = vec![vec![0.0], vec![1.0], vec![10.0], vec![11.0]];
        let values = vec![1.0, 1.2, 8.0, 8.2];
        let target = TargetView::Values(&values);
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let tree = Tree::grow(&rows, &target, &indices, 1, 1, &mut rng);
        let low = tree.predict_value(&[0.5]);
        let high = tree.predict_value(&[10.5]);
        assert!(low < 2.0, "low = {low}");
        assert!(high > 7.0, "high = {high}");
    }

    #[test]
    fn min_node_size_limits_growth() {
        let rows = vec![vec![1.0], vec![2.0], vec![10.0], vec![11.0]];
        let labels = vec![0, 1, 0, 1];
        let target = TargetView::Classes {
            labels: &labels,
            n_classes: 2,
        };
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let tree = Tree::grow(&rows, &target, &indices, 1, 4, &mut rng);
        assert_eq!(tree.n_nodes(), 1);
    }
}
