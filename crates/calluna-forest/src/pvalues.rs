//! Empirical-null p-values for permutation importance (Janitza et al. 2015).

use tracing::warn;

use crate::error::ForestError;

/// Per-variable output of the empirical-null test.
#[derive(Debug, Clone)]
pub struct ImportanceTest {
    /// The observed importance score.
    pub importance: f64,
    /// Lower confidence bound.
    pub ci_lower: f64,
    /// Upper confidence bound.
    pub ci_upper: f64,
    /// One-sided p-value under the empirical null.
    pub pvalue: f64,
}

/// Compute empirical-null p-values for a vector of importance scores.
///
/// Uninformative variables produce importance scores symmetric around zero,
/// so the non-positive scores estimate the null: the null distribution is
/// the negative scores, their mirror images, and the exact zeros. The
/// p-value per variable is the fraction of null values at or above its
/// score; a score above the entire null range gets a p-value of exactly 0.
/// Confidence bounds are the score offset by the null quantiles at
/// `(1 ± conf_level) / 2`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ForestError::InvalidConfidenceLevel`] | `conf_level` outside (0.0, 1.0) |
/// | [`ForestError::NoNegativeImportance`] | no score is strictly negative |
pub fn janitza_pvalues(
    importance: &[f64],
    conf_level: f64,
) -> Result<Vec<ImportanceTest>, ForestError> {
    if !(conf_level > 0.0 && conf_level < 1.0) {
        return Err(ForestError::InvalidConfidenceLevel { conf_level });
    }

    let negatives: Vec<f64> = importance.iter().copied().filter(|&v| v < 0.0).collect();
    if negatives.is_empty() {
        return Err(ForestError::NoNegativeImportance);
    }
    let zeros = importance.iter().filter(|&&v| v == 0.0).count();

    let mut null: Vec<f64> = Vec::with_capacity(negatives.len() * 2 + zeros);
    null.extend(&negatives);
    null.extend(negatives.iter().map(|&v| -v));
    null.extend(std::iter::repeat_n(0.0, zeros));
    null.sort_by(f64::total_cmp);

    if null.len() < 100 {
        warn!(
            null_size = null.len(),
            "fewer than 100 null importance values, p-values may be unreliable"
        );
    }

    let n = null.len() as f64;
    let q_lo = quantile(&null, (1.0 - conf_level) / 2.0);
    let q_hi = quantile(&null, (1.0 + conf_level) / 2.0);

    Ok(importance
        .iter()
        .map(|&v| {
            let at_or_above = null.iter().filter(|&&m| m >= v).count();
            ImportanceTest {
                importance: v,
                ci_lower: v + q_lo,
                ci_upper: v + q_hi,
                pvalue: at_or_above as f64 / n,
            }
        })
        .collect())
}

/// Empirical quantile of a sorted slice (nearest-rank on the scaled index).
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[idx]
}
