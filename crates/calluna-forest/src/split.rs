//! Best-split search for classification and regression nodes.

use rand_chacha::ChaCha8Rng;

use crate::target::TargetView;

/// Minimum impurity decrease for a split to be accepted.
const MIN_GAIN: f64 = 1e-12;

/// A chosen split with the resulting index partition.
#[derive(Debug, Clone)]
pub(crate) struct BestSplit {
    pub(crate) feature: usize,
    pub(crate) threshold: f64,
    pub(crate) left: Vec<usize>,
    pub(crate) right: Vec<usize>,
}

/// Search `mtry` random candidate features for the best threshold split.
///
/// Classification nodes minimize the size-weighted Gini impurity of the
/// children; regression nodes minimize the summed squared error. Returns
/// `None` when no candidate improves on the parent node.
pub(crate) fn find_best_split(
    rows: &[Vec<f64>],
    target: &TargetView<'_>,
    indices: &[usize],
    mtry: usize,
    rng: &mut ChaCha8Rng,
) -> Option<BestSplit> {
    let n_features = rows[indices[0]].len();
    let candidates = rand::seq::index::sample(rng, n_features, mtry.min(n_features)).into_vec();

    let mut best: Option<(f64, usize, f64)> = None; // (gain, feature, threshold)

    for &feature in &candidates {
        let mut ordered: Vec<usize> = indices.to_vec();
        ordered.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));

        let gain_threshold = match target {
            TargetView::Classes { labels, n_classes } => {
                best_threshold_classes(rows, labels, *n_classes, &ordered, feature)
            }
            TargetView::Values(values) => best_threshold_values(rows, values, &ordered, feature),
        };

        if let Some((gain, threshold)) = gain_threshold
            && best.is_none_or(|(g, _, _)| gain > g)
        {
            best = Some((gain, feature, threshold));
        }
    }

    let (_, feature, threshold) = best?;
    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| rows[i][feature] <= threshold);
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some(BestSplit {
        feature,
        threshold,
        left,
        right,
    })
}

/// Gini impurity scaled by the sample count: `n * (1 - Σ p_i²)`.
fn scaled_gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    let sum_sq: f64 = counts
        .iter()
        .map(|&c| {
            let p = c as f64 / nf;
            p * p
        })
        .sum();
    nf * (1.0 - sum_sq)
}

/// Scan sorted samples for the threshold minimizing child Gini impurity.
///
/// Returns `(gain, threshold)` where gain is the impurity decrease versus
/// the parent node, or `None` when every feature value is identical or no
/// boundary improves on the parent.
fn best_threshold_classes(
    rows: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
    ordered: &[usize],
    feature: usize,
) -> Option<(f64, f64)> {
    let n = ordered.len();

    let mut total_counts = vec![0usize; n_classes];
    for &i in ordered {
        total_counts[labels[i]] += 1;
    }
    let parent = scaled_gini(&total_counts, n);

    let mut left_counts = vec![0usize; n_classes];
    let mut right_counts = total_counts;
    let mut best: Option<(f64, f64)> = None;

    for pos in 0..n - 1 {
        let i = ordered[pos];
        left_counts[labels[i]] += 1;
        right_counts[labels[i]] -= 1;

        let here = rows[i][feature];
        let next = rows[ordered[pos + 1]][feature];
        if here == next {
            continue;
        }

        let gain =
            parent - scaled_gini(&left_counts, pos + 1) - scaled_gini(&right_counts, n - pos - 1);
        if gain > MIN_GAIN && best.is_none_or(|(g, _)| gain > g) {
            best = Some((gain, midpoint(here, next)));
        }
    }

    best
}

/// Scan sorted samples for the threshold minimizing child squared error.
fn best_threshold_values(
    rows: &[Vec<f64>],
    values: &[f64],
    ordered: &[usize],
    feature: usize,
) -> Option<(f64, f64)> {
    let n = ordered.len();

    let total_sum: f64 = ordered.iter().map(|&i| values[i]).sum();
    let total_sum_sq: f64 = ordered.iter().map(|&i| values[i] * values[i]).sum();
    let parent = total_sum_sq - total_sum * total_sum / n as f64;

    let mut left_sum = 0.0;
    let mut left_sum_sq = 0.0;
    let mut best: Option<(f64, f64)> = None;

    for pos in 0..n - 1 {
        let i = ordered[pos];
        left_sum += values[i];
        left_sum_sq += values[i] * values[i];

        let here = rows[i][feature];
        let next = rows[ordered[pos + 1]][feature];
        if here == next {
            continue;
        }

        let nl = (pos + 1) as f64;
        let nr = (n - pos - 1) as f64;
        let right_sum = total_sum - left_sum;
        let right_sum_sq = total_sum_sq - left_sum_sq;

        let sse_left = left_sum_sq - left_sum * left_sum / nl;
        let sse_right = right_sum_sq - right_sum * right_sum / nr;
        let gain = parent - sse_left - sse_right;
        if gain > MIN_GAIN && best.is_none_or(|(g, _)| gain > g) {
            best = Some((gain, midpoint(here, next)));
        }
    }

    best
}

/// Midpoint between two adjacent distinct feature values.
fn midpoint(a: f64, b: f64) -> f64 {
    a + (b - a) / 2.0
}
