//! Global Moran's I, used for residual spatial-autocorrelation checks.
//!
//! The statistic is computed with row-standardized weights; inference
//! uses full-permutation of the value vector with a two-sided pseudo
//! p-value. Islands contribute nothing to the cross-product term.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::weights::SpatialWeights;
use crate::StatsError;

/// Global Moran's I with permutation inference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoranResult {
    /// The observed statistic.
    pub i: f64,
    /// Expected value under the null, -1/(n-1).
    pub expected_i: f64,
    /// Two-sided permutation pseudo p-value.
    pub p_value: f64,
}

/// Computes global Moran's I for `values` under `weights`.
///
/// # Errors
///
/// Returns [`StatsError::LengthMismatch`] on slice/weight disagreement
/// and [`StatsError::NoPermutations`] for a zero permutation count.
pub fn global_moran(
    values: &[f64],
    weights: &SpatialWeights,
    permutations: usize,
    seed: u64,
) -> Result<MoranResult, StatsError> {
    let n = values.len();
    if n != weights.len() {
        return Err(StatsError::LengthMismatch {
            left: n,
            right: weights.len(),
        });
    }
    if permutations == 0 {
        return Err(StatsError::NoPermutations);
    }

    #[allow(clippy::cast_precision_loss)]
    let n_f = n as f64;
    let expected_i = -1.0 / (n_f - 1.0);

    let observed = moran_statistic(values, weights);
    if observed.is_nan() {
        // Constant surface: no variance, no autocorrelation to report.
        return Ok(MoranResult {
            i: 0.0,
            expected_i,
            p_value: 1.0,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut shuffled: Vec<f64> = values.to_vec();
    let mut extreme = 0usize;

    for _ in 0..permutations {
        shuffled.shuffle(&mut rng);
        let permuted = moran_statistic(&shuffled, weights);
        if (permuted - expected_i).abs() >= (observed - expected_i).abs() {
            extreme += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let p_value = (extreme + 1) as f64 / (permutations + 1) as f64;
    Ok(MoranResult {
        i: observed,
        expected_i,
        p_value,
    })
}

/// The raw statistic: (n / S0) * sum_i z_i * lag_i / sum_i z_i^2, with
/// S0 the total weight mass (one per non-island row). NaN for a
/// constant surface.
fn moran_statistic(values: &[f64], weights: &SpatialWeights) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n_f = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n_f;
    let deviations: Vec<f64> = values.iter().map(|v| v - mean).collect();

    let denom: f64 = deviations.iter().map(|z| z * z).sum();
    if denom <= f64::EPSILON {
        return f64::NAN;
    }

    let lag = weights.lag(&deviations);
    let numerator: f64 = deviations
        .iter()
        .zip(&lag)
        .enumerate()
        .filter(|(i, _)| !weights.is_island(*i))
        .map(|(_, (z, l))| z * l)
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let s0 = (values.len() - weights.island_count()) as f64;
    if s0 <= 0.0 {
        return f64::NAN;
    }

    (n_f / s0) * (numerator / denom)
}
