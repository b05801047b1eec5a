//! Quartic kernel density estimation at grid-cell centroids.
//!
//! The density surface smooths event points with a finite-support
//! quartic (biweight) kernel of fixed bandwidth. Evaluating at the
//! fishnet centroids yields the per-cell density raster used as the
//! traditional hotspot baseline.

use rstar::RTree;

use crate::StatsError;

/// Evaluates the quartic-kernel density of `events` at each of
/// `centers`, with search radius `bandwidth` (feet).
///
/// Each event within the bandwidth of a center contributes
/// `(3 / (pi r^2)) * (1 - (d/r)^2)^2`; events at or beyond the
/// bandwidth contribute nothing.
///
/// # Errors
///
/// Returns [`StatsError::InvalidBandwidth`] unless the bandwidth is
/// positive and finite.
pub fn quartic_density(
    events: &[(f64, f64)],
    centers: &[(f64, f64)],
    bandwidth: f64,
) -> Result<Vec<f64>, StatsError> {
    if !(bandwidth.is_finite() && bandwidth > 0.0) {
        return Err(StatsError::InvalidBandwidth { value: bandwidth });
    }

    let tree: RTree<[f64; 2]> =
        RTree::bulk_load(events.iter().map(|&(x, y)| [x, y]).collect());
    let scale = 3.0 / (std::f64::consts::PI * bandwidth * bandwidth);
    let radius_sq = bandwidth * bandwidth;

    let densities = centers
        .iter()
        .map(|&(cx, cy)| {
            tree.locate_within_distance([cx, cy], radius_sq)
                .map(|event| {
                    let dx = event[0] - cx;
                    let dy = event[1] - cy;
                    let ratio_sq = (dx * dx + dy * dy) / radius_sq;
                    let falloff = 1.0 - ratio_sq;
                    scale * falloff * falloff
                })
                .sum()
        })
        .collect();

    Ok(densities)
}
