//! Permutation-based variable importance.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::target::TargetView;
use crate::tree::Tree;

/// Accuracy of one tree on its evaluation set (classification).
fn tree_accuracy(
    tree: &Tree,
    features: &[Vec<f64>],
    labels: &[usize],
    eval_indices: &[usize],
) -> f64 {
    let correct = eval_indices
        .iter()
        .filter(|&&idx| tree.predict_class(&features[idx]) == labels[idx])
        .count();
    correct as f64 / eval_indices.len() as f64
}

/// Mean squared error of one tree on its evaluation set (regression).
fn tree_mse(tree: &Tree, features: &[Vec<f64>], values: &[f64], eval_indices: &[usize]) -> f64 {
    let sum_sq: f64 = eval_indices
        .iter()
        .map(|&idx| {
            let err = tree.predict_value(&features[idx]) - values[idx];
            err * err
        })
        .sum();
    sum_sq / eval_indices.len() as f64
}

/// Score one tree with a single feature column permuted among its
/// evaluation samples. Returns accuracy (classification) or MSE (regression).
fn permuted_score(
    tree: &Tree,
    features: &[Vec<f64>],
    target: &TargetView<'_>,
    eval_indices: &[usize],
    feature_idx: usize,
    rng: &mut ChaCha8Rng,
) -> f64 {
    let mut permuted_values: Vec<f64> = eval_indices
        .iter()
        .map(|&idx| features[idx][feature_idx])
        .collect();
    permuted_values.shuffle(rng);

    match target {
        TargetView::Classes { labels, .. } => {
            let correct = eval_indices
                .iter()
                .zip(permuted_values.iter())
                .filter(|&(&idx, &permuted)| {
                    let mut sample = features[idx].clone();
                    sample[feature_idx] = permuted;
                    tree.predict_class(&sample) == labels[idx]
                })
                .count();
            correct as f64 / eval_indices.len() as f64
        }
        TargetView::Values(values) => {
            let sum_sq: f64 = eval_indices
                .iter()
                .zip(permuted_values.iter())
                .map(|(&idx, &permuted)| {
                    let mut sample = features[idx].clone();
                    sample[feature_idx] = permuted;
                    let err = tree.predict_value(&sample) - values[idx];
                    err * err
                })
                .sum();
            sum_sq / eval_indices.len() as f64
        }
    }
}

/// Compute permutation importance across the ensemble.
///
/// For each tree, each feature column is permuted among that tree's
/// evaluation samples. The per-tree score is the accuracy drop
/// (classification) or MSE increase (regression); the final importance per
/// feature is the mean across trees with a non-empty evaluation set. Scores
/// are raw: negative values estimate the noise floor and are preserved.
pub(crate) fn compute_permutation_importance(
    trees: &[Tree],
    features: &[Vec<f64>],
    target: &TargetView<'_>,
    eval_indices_per_tree: &[Vec<usize>],
    seed: u64,
) -> Vec<f64> {
    let n_features = features[0].len();

    let per_tree: Vec<Vec<f64>> = trees
        .iter()
        .zip(eval_indices_per_tree.iter())
        .enumerate()
        .collect::<Vec<_>>()
        .into_par_iter()
        .filter(|(_, (_, eval))| !eval.is_empty())
        .map(|(tree_idx, (tree, eval))| {
            let baseline = match target {
                TargetView::Classes { labels, .. } => tree_accuracy(tree, features, labels, eval),
                TargetView::Values(values) => tree_mse(tree, features, values, eval),
            };

            (0..n_features)
                .map(|feature_idx| {
                    let rng_seed = seed
                        .wrapping_add((tree_idx as u64).wrapping_mul(n_features as u64))
                        .wrapping_add(feature_idx as u64);
                    let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);
                    let permuted =
                        permuted_score(tree, features, target, eval, feature_idx, &mut rng);
                    match target {
                        // Accuracy drops when an informative feature is destroyed.
                        TargetView::Classes { .. } => baseline - permuted,
                        // MSE rises when an informative feature is destroyed.
                        TargetView::Values(_) => permuted - baseline,
                    }
                })
                .collect()
        })
        .collect();

    if per_tree.is_empty() {
        return vec![0.0; n_features];
    }

    let n_trees = per_tree.len() as f64;
    (0..n_features)
        .map(|f| per_tree.iter().map(|scores| scores[f]).sum::<f64>() / n_trees)
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::config::{ForestConfig, ImportanceMode};
    use crate::target::Target;

    /// Feature 0 separates the classes; feature 1 is constant noise.
    fn make_data() -> (Vec<Vec<f64>>, Target) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            features.push(vec![i as f64 * 0.1, 0.5]);
            labels.push(0);
        }
        for i in 0..30 {
            features.push(vec![10.0 + i as f64 * 0.1, 0.5]);
            labels.push(1);
        }
        (features, Target::Classes(labels))
    }

    #[test]
    fn informative_feature_outranks_noise() {
        let (features, target) = make_data();
        let fit = ForestConfig::new(50)
            .unwrap()
            .with_importance(ImportanceMode::Permutation)
            .with_seed(42)
            .fit(&features, &target)
            .unwrap();
        let importance = fit.importance().unwrap();
        assert_eq!(importance.len(), 2);
        assert!(
            importance[0] > importance[1],
            "informative ({}) should beat noise ({})",
            importance[0],
            importance[1]
        );
        assert!(importance[0] > 0.1, "importance[0] = {}", importance[0]);
    }

    #[test]
    fn constant_feature_importance_near_zero() {
        let (features, target) = make_data();
        let fit = ForestConfig::new(50)
            .unwrap()
            .with_importance(ImportanceMode::Permutation)
            .with_seed(42)
            .fit(&features, &target)
            .unwrap();
        let importance = fit.importance().unwrap();
        assert!(importance[1].abs() < 0.05, "noise importance = {}", importance[1]);
    }

    #[test]
    fn holdout_importance_uses_zero_weight_fold() {
        let (features, target) = make_data();
        // First half in-bag, second half held out.
        let weights: Vec<f64> = (0..60).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
        let fit = ForestConfig::new(50)
            .unwrap()
            .with_importance(ImportanceMode::Permutation)
            .with_case_weights(Some(weights))
            .with_holdout(true)
            .with_replace(false)
            .with_seed(42)
            .fit(&features, &target)
            .unwrap();
        let importance = fit.importance().unwrap();
        assert!(
            importance[0] > importance[1],
            "holdout importance should still rank the informative feature first"
        );
    }
}
