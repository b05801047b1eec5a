//! Point-to-cell containment aggregation.
//!
//! Joins a projected point set against the fishnet via the R-tree cell
//! index and counts matches per cell. Every cell appears in the result,
//! with zero for cells no point falls in; points outside the grid are
//! dropped and reported in the log.

use std::collections::BTreeMap;

use geo::Coord;
use riskgrid_spatial::CellIndex;

use crate::Fishnet;

/// Counts points per grid cell.
///
/// The result holds one entry per cell id, zero-filled, so downstream
/// joins never observe a missing count.
#[must_use]
pub fn count_per_cell(
    fishnet: &Fishnet,
    index: &CellIndex,
    points: &[Coord<f64>],
) -> BTreeMap<u32, u32> {
    let mut counts: BTreeMap<u32, u32> =
        fishnet.cells().iter().map(|c| (c.id, 0)).collect();

    let mut outside = 0usize;
    for point in points {
        match index.lookup(point.x, point.y) {
            Some(id) => {
                if let Some(count) = counts.get_mut(&id) {
                    *count += 1;
                }
            }
            None => outside += 1,
        }
    }

    if outside > 0 {
        log::debug!("{outside} of {} points fell outside the grid", points.len());
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn strip_fishnet() -> Fishnet {
        // 10 cells in a single 10x1 row.
        let boundary = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]]);
        Fishnet::build(&boundary, 1.0).unwrap()
    }

    #[test]
    fn three_points_in_cell_four_zero_elsewhere() {
        let net = strip_fishnet();
        assert_eq!(net.len(), 10);
        let index = net.build_index().unwrap();

        // Cell 4 spans x in [3, 4).
        let points = vec![
            Coord { x: 3.2, y: 0.5 },
            Coord { x: 3.5, y: 0.2 },
            Coord { x: 3.9, y: 0.9 },
        ];
        let counts = count_per_cell(&net, &index, &points);

        let vector: Vec<u32> = (1..=10).map(|id| counts[&id]).collect();
        assert_eq!(vector, vec![0, 0, 0, 3, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn counts_sum_to_points_inside_grid() {
        let net = strip_fishnet();
        let index = net.build_index().unwrap();

        let points = vec![
            Coord { x: 0.5, y: 0.5 },
            Coord { x: 5.5, y: 0.5 },
            Coord { x: 9.5, y: 0.5 },
            Coord { x: 50.0, y: 50.0 }, // outside
        ];
        let counts = count_per_cell(&net, &index, &points);
        let total: u32 = counts.values().sum();
        assert_eq!(total, 3, "outside points must not be counted");
    }

    #[test]
    fn empty_point_set_yields_all_zeros() {
        let net = strip_fishnet();
        let index = net.build_index().unwrap();
        let counts = count_per_cell(&net, &index, &[]);

        assert_eq!(counts.len(), net.len());
        assert!(counts.values().all(|&c| c == 0));
    }
}
