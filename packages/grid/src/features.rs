//! Per-cell feature assembly.
//!
//! Combines the containment counts, the k-nearest-neighbor distance
//! smoothing of each risk-factor layer, and the community-area
//! assignment into one [`CellProfile`] row per cell.

use std::collections::BTreeMap;

use geo::Coord;
use riskgrid_models::{CellProfile, RiskFactorKind};
use riskgrid_spatial::knn::PointIndex;
use riskgrid_spatial::RegionIndex;

use crate::{Fishnet, GridError};

/// Mean distance from every cell centroid to the `k` nearest points of
/// one risk-factor layer.
///
/// # Errors
///
/// Returns [`GridError::Spatial`] if the layer has no points at all
/// (a configuration error: the feature would be undefined everywhere).
pub fn knn_distance_feature(
    fishnet: &Fishnet,
    factor_points: &[(f64, f64)],
    k: usize,
) -> Result<BTreeMap<u32, f64>, GridError> {
    let index = PointIndex::build(factor_points);

    let mut distances = BTreeMap::new();
    for cell in fishnet.cells() {
        let d = index.mean_knn_distance((cell.centroid.x, cell.centroid.y), k)?;
        distances.insert(cell.id, d);
    }
    Ok(distances)
}

/// Assigns each cell to the region (community area) containing its
/// centroid. Cells whose centroid falls outside every region (possible
/// for edge cells kept whole) get `None`.
#[must_use]
pub fn assign_regions(fishnet: &Fishnet, regions: &RegionIndex) -> BTreeMap<u32, Option<String>> {
    let mut assigned = BTreeMap::new();
    let mut unassigned = 0usize;

    for cell in fishnet.cells() {
        let name = regions
            .lookup(cell.centroid.x, cell.centroid.y)
            .map(String::from);
        if name.is_none() {
            unassigned += 1;
        }
        assigned.insert(cell.id, name);
    }

    if unassigned > 0 {
        log::info!(
            "{unassigned} of {} cell centroids fall outside every region",
            fishnet.len()
        );
    }
    assigned
}

/// Builds the full per-cell profile table from the aggregation outputs.
///
/// # Errors
///
/// Returns [`GridError::Spatial`] if any risk-factor layer is empty.
pub fn build_profiles(
    fishnet: &Fishnet,
    event_counts: &BTreeMap<u32, u32>,
    factor_points: &BTreeMap<RiskFactorKind, Vec<(f64, f64)>>,
    factor_counts: &BTreeMap<RiskFactorKind, BTreeMap<u32, u32>>,
    regions: &RegionIndex,
    k: usize,
) -> Result<Vec<CellProfile>, GridError> {
    let mut nn_by_factor: BTreeMap<RiskFactorKind, BTreeMap<u32, f64>> = BTreeMap::new();
    for (kind, points) in factor_points {
        nn_by_factor.insert(*kind, knn_distance_feature(fishnet, points, k)?);
    }

    let neighborhoods = assign_regions(fishnet, regions);

    let profiles = fishnet
        .cells()
        .iter()
        .map(|cell| {
            let factor_count_row: BTreeMap<RiskFactorKind, u32> = factor_counts
                .iter()
                .map(|(kind, counts)| (*kind, counts.get(&cell.id).copied().unwrap_or(0)))
                .collect();
            let nn_row: BTreeMap<RiskFactorKind, f64> = nn_by_factor
                .iter()
                .map(|(kind, distances)| {
                    (*kind, distances.get(&cell.id).copied().unwrap_or(0.0))
                })
                .collect();

            CellProfile {
                cell_id: cell.id,
                event_count: event_counts.get(&cell.id).copied().unwrap_or(0),
                factor_counts: factor_count_row,
                factor_nn_distance: nn_row,
                neighborhood: neighborhoods.get(&cell.id).cloned().flatten(),
            }
        })
        .collect();

    Ok(profiles)
}

/// Extracts planar centroids as `(x, y)` tuples for index construction.
#[must_use]
pub fn centroid_tuples(fishnet: &Fishnet) -> Vec<(f64, f64)> {
    fishnet
        .cells()
        .iter()
        .map(|c| (c.centroid.x, c.centroid.y))
        .collect()
}

/// Converts projected coordinates to the tuple form used by point
/// indexes.
#[must_use]
pub fn coord_tuples(coords: &[Coord<f64>]) -> Vec<(f64, f64)> {
    coords.iter().map(|c| (c.x, c.y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::count_per_cell;
    use geo::{polygon, MultiPolygon};

    fn square_fishnet() -> Fishnet {
        let boundary = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0),
            (x: 0.0, y: 4.0),
            (x: 0.0, y: 0.0),
        ]]);
        Fishnet::build(&boundary, 2.0).unwrap()
    }

    #[test]
    fn knn_feature_is_non_negative_everywhere() {
        let net = square_fishnet();
        let points = vec![(0.5, 0.5), (3.5, 3.5), (2.0, 2.0)];
        let distances = knn_distance_feature(&net, &points, 2).unwrap();

        assert_eq!(distances.len(), net.len());
        assert!(distances.values().all(|&d| d >= 0.0));
    }

    #[test]
    fn empty_factor_layer_is_a_configuration_error() {
        let net = square_fishnet();
        assert!(knn_distance_feature(&net, &[], 3).is_err());
    }

    #[test]
    fn profiles_cover_every_cell_with_zero_defaults() {
        let net = square_fishnet();
        let index = net.build_index().unwrap();

        let event_counts = count_per_cell(&net, &index, &[geo::Coord { x: 0.5, y: 0.5 }]);

        let mut factor_points = BTreeMap::new();
        let mut factor_counts = BTreeMap::new();
        for kind in RiskFactorKind::all() {
            factor_points.insert(*kind, vec![(1.0, 1.0)]);
            factor_counts.insert(*kind, count_per_cell(&net, &index, &[]));
        }

        let regions = RegionIndex::build(&[]);
        let profiles =
            build_profiles(&net, &event_counts, &factor_points, &factor_counts, &regions, 3)
                .unwrap();

        assert_eq!(profiles.len(), net.len());
        assert_eq!(profiles[0].event_count, 1);
        for profile in &profiles {
            assert_eq!(profile.factor_counts.len(), RiskFactorKind::all().len());
            assert!(profile.factor_counts.values().all(|&c| c == 0));
            assert!(profile.neighborhood.is_none());
        }
    }
}
