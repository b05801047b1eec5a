//! Queen-contiguity spatial weights.
//!
//! Two cells are queen neighbors when their polygons share any boundary
//! point (edge or vertex). Weights are row-standardized: each neighbor
//! of a cell with degree d carries weight 1/d. Cells with no neighbors
//! ("islands") are retained with an empty row; they take the neutral
//! value in every downstream statistic rather than failing the run.

use geo::{BoundingRect, Intersects, Polygon};
use rstar::{AABB, RTree, RTreeObject};

/// Envelope slack when searching for touching polygons, in feet.
const TOUCH_TOLERANCE: f64 = 1e-6;

struct WeightEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for WeightEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Row-standardized queen-contiguity weights over an ordered set of
/// polygons.
pub struct SpatialWeights {
    neighbors: Vec<Vec<usize>>,
    island_count: usize,
}

impl SpatialWeights {
    /// Builds queen-contiguity weights for `polygons`, in input order.
    #[must_use]
    pub fn queen(polygons: &[Polygon<f64>]) -> Self {
        let entries: Vec<WeightEntry> = polygons
            .iter()
            .enumerate()
            .filter_map(|(index, polygon)| {
                polygon.bounding_rect().map(|rect| WeightEntry {
                    index,
                    envelope: AABB::from_corners(
                        [rect.min().x - TOUCH_TOLERANCE, rect.min().y - TOUCH_TOLERANCE],
                        [rect.max().x + TOUCH_TOLERANCE, rect.max().y + TOUCH_TOLERANCE],
                    ),
                })
            })
            .collect();
        let tree = RTree::bulk_load(entries);

        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); polygons.len()];
        for (index, polygon) in polygons.iter().enumerate() {
            let Some(rect) = polygon.bounding_rect() else {
                continue;
            };
            let query = AABB::from_corners(
                [rect.min().x - TOUCH_TOLERANCE, rect.min().y - TOUCH_TOLERANCE],
                [rect.max().x + TOUCH_TOLERANCE, rect.max().y + TOUCH_TOLERANCE],
            );

            for candidate in tree.locate_in_envelope_intersecting(&query) {
                if candidate.index != index && polygon.intersects(&polygons[candidate.index]) {
                    neighbors[index].push(candidate.index);
                }
            }
            neighbors[index].sort_unstable();
        }

        let island_count = neighbors.iter().filter(|n| n.is_empty()).count();
        if island_count > 0 {
            log::info!(
                "Queen weights: {island_count} of {} cells have no neighbors",
                polygons.len()
            );
        }

        Self {
            neighbors,
            island_count,
        }
    }

    /// Number of spatial units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Returns `true` if the weight matrix covers no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Neighbor indices of unit `i`.
    #[must_use]
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.neighbors[i]
    }

    /// Returns `true` if unit `i` has no neighbors.
    #[must_use]
    pub fn is_island(&self, i: usize) -> bool {
        self.neighbors[i].is_empty()
    }

    /// Number of units with no neighbors.
    #[must_use]
    pub const fn island_count(&self) -> usize {
        self.island_count
    }

    /// Row-standardized spatial lag of `values`: the mean of each unit's
    /// neighbor values. Islands lag to 0.
    #[must_use]
    pub fn lag(&self, values: &[f64]) -> Vec<f64> {
        self.neighbors
            .iter()
            .map(|row| {
                if row.is_empty() {
                    0.0
                } else {
                    #[allow(clippy::cast_precision_loss)]
                    let degree = row.len() as f64;
                    row.iter().map(|&j| values[j]).sum::<f64>() / degree
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x0: f64, y0: f64, side: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + side, y: y0),
            (x: x0 + side, y: y0 + side),
            (x: x0, y: y0 + side),
            (x: x0, y: y0),
        ]
    }

    #[test]
    fn strip_adjacency_degrees() {
        let cells = vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0), square(2.0, 0.0, 1.0)];
        let weights = SpatialWeights::queen(&cells);

        assert_eq!(weights.neighbors(0), &[1]);
        assert_eq!(weights.neighbors(1), &[0, 2]);
        assert_eq!(weights.neighbors(2), &[1]);
        assert_eq!(weights.island_count(), 0);
    }

    #[test]
    fn corner_touching_cells_are_queen_neighbors() {
        // Diagonal cells share only the vertex at (1, 1).
        let cells = vec![square(0.0, 0.0, 1.0), square(1.0, 1.0, 1.0)];
        let weights = SpatialWeights::queen(&cells);

        assert_eq!(weights.neighbors(0), &[1]);
        assert_eq!(weights.neighbors(1), &[0]);
    }

    #[test]
    fn detached_cell_is_an_island() {
        let cells = vec![square(0.0, 0.0, 1.0), square(10.0, 10.0, 1.0)];
        let weights = SpatialWeights::queen(&cells);

        assert!(weights.is_island(0));
        assert!(weights.is_island(1));
        assert_eq!(weights.island_count(), 2);
    }

    #[test]
    fn lag_is_mean_of_neighbor_values() {
        let cells = vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0), square(2.0, 0.0, 1.0)];
        let weights = SpatialWeights::queen(&cells);

        let lag = weights.lag(&[1.0, 5.0, 9.0]);
        assert!((lag[0] - 5.0).abs() < 1e-12);
        assert!((lag[1] - 5.0).abs() < 1e-12, "middle lags to mean of ends");
        assert!((lag[2] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn island_lags_to_zero() {
        let cells = vec![square(0.0, 0.0, 1.0), square(10.0, 10.0, 1.0)];
        let weights = SpatialWeights::queen(&cells);
        let lag = weights.lag(&[3.0, 7.0]);
        assert!(lag.iter().all(|&v| v.abs() < f64::EPSILON));
    }
}
