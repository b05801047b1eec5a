//! Local indicators of spatial association (local Moran's I).
//!
//! Per-cell local Moran's I with conditional-permutation pseudo
//! p-values: for each cell, the observed statistic is compared against
//! the distribution obtained by drawing the cell's neighbor values at
//! random from all other cells. Islands keep the neutral statistic
//! (I = 0, p = 1) and are never flagged significant.

use rand::rngs::StdRng;
use rand::SeedableRng;
use riskgrid_spatial::knn::PointIndex;

use crate::weights::SpatialWeights;
use crate::StatsError;

/// Configuration for local Moran inference.
#[derive(Debug, Clone, Copy)]
pub struct LisaConfig {
    /// Number of conditional permutations per cell.
    pub permutations: usize,
    /// RNG seed; fixed per run for reproducible inference.
    pub seed: u64,
    /// Pseudo p-value at or below which a cell is flagged significant.
    pub significance: f64,
}

impl Default for LisaConfig {
    fn default() -> Self {
        Self {
            permutations: 999,
            seed: 7,
            significance: 0.001,
        }
    }
}

/// Local Moran's I result for one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LisaCell {
    /// The local statistic.
    pub local_i: f64,
    /// Conditional-permutation pseudo p-value.
    pub p_value: f64,
    /// Whether the cell clears the significance threshold.
    pub significant: bool,
}

/// Computes local Moran's I for every cell.
///
/// Values are taken in cell-id order, matching the weight matrix. A
/// constant surface has no spatial structure to test; every cell comes
/// back neutral.
///
/// # Errors
///
/// Returns [`StatsError::LengthMismatch`] if `values` and `weights`
/// disagree, or [`StatsError::NoPermutations`] for a zero permutation
/// count.
pub fn local_moran(
    values: &[f64],
    weights: &SpatialWeights,
    config: &LisaConfig,
) -> Result<Vec<LisaCell>, StatsError> {
    let n = values.len();
    if n != weights.len() {
        return Err(StatsError::LengthMismatch {
            left: n,
            right: weights.len(),
        });
    }
    if config.permutations == 0 {
        return Err(StatsError::NoPermutations);
    }

    #[allow(clippy::cast_precision_loss)]
    let n_f = n as f64;
    let mean = values.iter().sum::<f64>() / n_f;
    let deviations: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let m2 = deviations.iter().map(|z| z * z).sum::<f64>() / n_f;

    // Constant surface: every deviation is zero, the statistic is
    // undefined, and nothing can be significant.
    if m2 <= f64::EPSILON {
        log::warn!("Local Moran over a constant surface; all cells neutral");
        return Ok(vec![
            LisaCell {
                local_i: 0.0,
                p_value: 1.0,
                significant: false,
            };
            n
        ]);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut results = Vec::with_capacity(n);

    for i in 0..n {
        if weights.is_island(i) {
            results.push(LisaCell {
                local_i: 0.0,
                p_value: 1.0,
                significant: false,
            });
            continue;
        }

        let neighbors = weights.neighbors(i);
        #[allow(clippy::cast_precision_loss)]
        let degree_f = neighbors.len() as f64;
        let observed_lag =
            neighbors.iter().map(|&j| deviations[j]).sum::<f64>() / degree_f;
        let observed_i = deviations[i] / m2 * observed_lag;

        // Conditional permutation: hold z_i fixed, draw this cell's
        // neighbor set from the other n-1 deviations.
        let mut extreme = 0usize;
        for _ in 0..config.permutations {
            let draw = rand::seq::index::sample(&mut rng, n - 1, neighbors.len());
            let lag = draw
                .iter()
                .map(|raw| {
                    let j = if raw >= i { raw + 1 } else { raw };
                    deviations[j]
                })
                .sum::<f64>()
                / degree_f;
            let permuted_i = deviations[i] / m2 * lag;

            let is_extreme = if observed_i >= 0.0 {
                permuted_i >= observed_i
            } else {
                permuted_i <= observed_i
            };
            if is_extreme {
                extreme += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let p_value = (extreme + 1) as f64 / (config.permutations + 1) as f64;
        results.push(LisaCell {
            local_i: observed_i,
            p_value,
            significant: p_value <= config.significance,
        });
    }

    let flagged = results.iter().filter(|r| r.significant).count();
    log::info!(
        "Local Moran: {flagged} of {n} cells significant at p <= {}",
        config.significance
    );
    Ok(results)
}

/// Distance from every centroid to the nearest significant cell's
/// centroid. Significant cells are distance 0 from themselves.
///
/// When no cell is significant the feature degrades to 0 everywhere so
/// the design-matrix shape stays stable.
#[must_use]
pub fn cluster_distance(centroids: &[(f64, f64)], lisa: &[LisaCell]) -> Vec<f64> {
    let significant: Vec<(f64, f64)> = centroids
        .iter()
        .zip(lisa)
        .filter(|(_, cell)| cell.significant)
        .map(|(c, _)| *c)
        .collect();

    if significant.is_empty() {
        log::warn!("No significant cluster cells; cluster-distance feature is zero");
        return vec![0.0; centroids.len()];
    }

    let index = PointIndex::build(&significant);
    centroids
        .iter()
        .map(|&c| index.nearest_distance(c).unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use geo::Polygon;

    fn square(x0: f64, y0: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + 1.0, y: y0),
            (x: x0 + 1.0, y: y0 + 1.0),
            (x: x0, y: y0 + 1.0),
            (x: x0, y: y0),
        ]
    }

    /// A 10x10 grid of unit cells, row-major.
    fn grid_10x10() -> Vec<Polygon<f64>> {
        let mut cells = Vec::new();
        for row in 0..10 {
            for col in 0..10 {
                cells.push(square(f64::from(col), f64::from(row)));
            }
        }
        cells
    }

    #[test]
    fn constant_surface_is_neutral() {
        let cells = grid_10x10();
        let weights = SpatialWeights::queen(&cells);
        let values = vec![4.0; cells.len()];

        let lisa = local_moran(&values, &weights, &LisaConfig::default()).unwrap();
        assert!(lisa.iter().all(|c| !c.significant));
        assert!(lisa.iter().all(|c| (c.p_value - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn hotspot_center_is_significant_far_cell_is_not() {
        let cells = grid_10x10();
        let weights = SpatialWeights::queen(&cells);

        // A 3x3 block of high values centered at (row 5, col 5).
        let mut values = vec![0.0; 100];
        for row in 4..7 {
            for col in 4..7 {
                values[row * 10 + col] = 100.0;
            }
        }

        let lisa = local_moran(&values, &weights, &LisaConfig::default()).unwrap();

        let center = 5 * 10 + 5;
        assert!(
            lisa[center].significant,
            "cluster center p={} should clear 0.001",
            lisa[center].p_value
        );
        assert!(lisa[center].local_i > 0.0);

        let far_corner = 0;
        assert!(
            !lisa[far_corner].significant,
            "low-value corner p={} should not be significant",
            lisa[far_corner].p_value
        );
    }

    #[test]
    fn p_values_are_in_unit_interval() {
        let cells = grid_10x10();
        let weights = SpatialWeights::queen(&cells);
        let values: Vec<f64> = (0..100).map(|i| f64::from(i % 7)).collect();

        let lisa = local_moran(&values, &weights, &LisaConfig::default()).unwrap();
        for cell in &lisa {
            assert!(cell.p_value > 0.0 && cell.p_value <= 1.0);
        }
    }

    #[test]
    fn islands_are_never_flagged() {
        let cells = vec![square(0.0, 0.0), square(5.0, 5.0), square(6.0, 5.0)];
        let weights = SpatialWeights::queen(&cells);
        let values = vec![1000.0, 1.0, 2.0];

        let lisa = local_moran(&values, &weights, &LisaConfig::default()).unwrap();
        assert!(!lisa[0].significant, "island must stay neutral");
        assert!((lisa[0].local_i).abs() < f64::EPSILON);
        assert!((lisa[0].p_value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let cells = grid_10x10();
        let weights = SpatialWeights::queen(&cells);
        let values: Vec<f64> = (0..100).map(|i| f64::from((i * 13) % 11)).collect();

        let a = local_moran(&values, &weights, &LisaConfig::default()).unwrap();
        let b = local_moran(&values, &weights, &LisaConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cluster_distance_zero_at_cluster_and_grows_away() {
        let centroids = vec![(0.5, 0.5), (1.5, 0.5), (5.5, 0.5)];
        let lisa = vec![
            LisaCell {
                local_i: 3.0,
                p_value: 0.001,
                significant: true,
            },
            LisaCell {
                local_i: 0.1,
                p_value: 0.4,
                significant: false,
            },
            LisaCell {
                local_i: 0.0,
                p_value: 0.9,
                significant: false,
            },
        ];

        let distances = cluster_distance(&centroids, &lisa);
        assert!(distances[0].abs() < 1e-12);
        assert!((distances[1] - 1.0).abs() < 1e-12);
        assert!((distances[2] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn no_significant_cells_degrades_to_zero() {
        let centroids = vec![(0.5, 0.5), (1.5, 0.5)];
        let lisa = vec![
            LisaCell {
                local_i: 0.1,
                p_value: 0.5,
                significant: false,
            };
            2
        ];
        let distances = cluster_distance(&centroids, &lisa);
        assert_eq!(distances, vec![0.0, 0.0]);
    }
}
