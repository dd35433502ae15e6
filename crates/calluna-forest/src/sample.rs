//! Per-tree resampling, with and without replacement, honoring case weights.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand_chacha::ChaCha8Rng;

/// One tree's resample: the drawn indices and the in-bag mask.
#[derive(Debug)]
pub(crate) struct TreeSample {
    pub(crate) drawn: Vec<usize>,
    pub(crate) in_bag: Vec<bool>,
}

impl TreeSample {
    /// Out-of-bag indices: samples never drawn for this tree.
    pub(crate) fn oob_indices(&self) -> Vec<usize> {
        (0..self.in_bag.len())
            .filter(|&i| !self.in_bag[i])
            .collect()
    }
}

/// Draw `draw_count` sample indices.
///
/// Weight-zero samples are never drawn. Without replacement the draw count
/// is clamped to the number of positive-weight samples.
pub(crate) fn draw_sample(
    n_samples: usize,
    draw_count: usize,
    weights: Option<&[f64]>,
    replace: bool,
    rng: &mut ChaCha8Rng,
) -> TreeSample {
    let drawn = match (weights, replace) {
        (None, true) => (0..draw_count).map(|_| rng.gen_range(0..n_samples)).collect(),
        (None, false) => {
            let k = draw_count.min(n_samples);
            rand::seq::index::sample(rng, n_samples, k).into_vec()
        }
        (Some(w), true) => {
            // Weights are pre-validated: finite, non-negative, not all zero.
            let dist = WeightedIndex::new(w.iter().copied())
                .expect("case weights validated before sampling");
            (0..draw_count).map(|_| dist.sample(rng)).collect()
        }
        (Some(w), false) => weighted_without_replacement(w, draw_count, rng),
    };

    let mut in_bag = vec![false; n_samples];
    for &i in &drawn {
        in_bag[i] = true;
    }
    TreeSample { drawn, in_bag }
}

/// Efraimidis-Spirakis weighted sampling without replacement.
///
/// Each positive-weight sample gets the key `u^(1/w)` for uniform `u`; the
/// `draw_count` largest keys are kept.
fn weighted_without_replacement(
    weights: &[f64],
    draw_count: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<usize> {
    let mut keyed: Vec<(f64, usize)> = weights
        .iter()
        .enumerate()
        .filter(|&(_, &w)| w > 0.0)
        .map(|(i, &w)| (rng.r#gen::<f64>().powf(1.0 / w), i))
        .collect();
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
    keyed.truncate(draw_count);
    keyed.into_iter().map(|(_, i)| i).collect()
}
