//! Nearest-neighbor queries over planar point sets.
//!
//! Wraps an R-tree of projected points and answers the mean-distance-to-
//! k-nearest-points queries used for the smoothed risk-factor features.

use rstar::RTree;

use crate::SpatialError;

/// R-tree index over a planar point set.
pub struct PointIndex {
    tree: RTree<[f64; 2]>,
}

impl PointIndex {
    /// Builds the index from planar `(x, y)` points.
    #[must_use]
    pub fn build(points: &[(f64, f64)]) -> Self {
        let entries: Vec<[f64; 2]> = points.iter().map(|&(x, y)| [x, y]).collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if the index holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Mean planar distance from `origin` to its `k` nearest indexed
    /// points.
    ///
    /// If fewer than `k` points are indexed, the mean is taken over
    /// however many are available.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::EmptyReferenceSet`] if the index is empty,
    /// since a mean over zero neighbors is undefined.
    pub fn mean_knn_distance(&self, origin: (f64, f64), k: usize) -> Result<f64, SpatialError> {
        if self.tree.size() == 0 || k == 0 {
            return Err(SpatialError::EmptyReferenceSet);
        }

        let query = [origin.0, origin.1];
        let mut total = 0.0;
        let mut found = 0usize;

        for neighbor in self.tree.nearest_neighbor_iter(&query).take(k) {
            let dx = neighbor[0] - query[0];
            let dy = neighbor[1] - query[1];
            total += dx.hypot(dy);
            found += 1;
        }

        #[allow(clippy::cast_precision_loss)]
        let mean = total / found as f64;
        Ok(mean)
    }

    /// Distance from `origin` to the single nearest indexed point.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::EmptyReferenceSet`] if the index is empty.
    pub fn nearest_distance(&self, origin: (f64, f64)) -> Result<f64, SpatialError> {
        self.mean_knn_distance(origin, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_index_is_an_error() {
        let index = PointIndex::build(&[]);
        assert!(index.mean_knn_distance((0.0, 0.0), 3).is_err());
    }

    #[test]
    fn coincident_points_give_zero_distance() {
        let index = PointIndex::build(&[(2.0, 3.0), (2.0, 3.0), (2.0, 3.0)]);
        let d = index.mean_knn_distance((2.0, 3.0), 3).unwrap();
        assert!(d.abs() < f64::EPSILON, "expected 0, got {d}");
    }

    #[test]
    fn fewer_than_k_averages_available_points() {
        let index = PointIndex::build(&[(3.0, 0.0), (5.0, 0.0)]);
        let d = index.mean_knn_distance((0.0, 0.0), 3).unwrap();
        assert!((d - 4.0).abs() < 1e-12, "expected mean 4.0, got {d}");
    }

    #[test]
    fn result_is_invariant_to_input_ordering() {
        let forward = PointIndex::build(&[(1.0, 0.0), (0.0, 2.0), (4.0, 4.0), (9.0, 1.0)]);
        let reversed = PointIndex::build(&[(9.0, 1.0), (4.0, 4.0), (0.0, 2.0), (1.0, 0.0)]);

        let a = forward.mean_knn_distance((0.5, 0.5), 3).unwrap();
        let b = reversed.mean_knn_distance((0.5, 0.5), 3).unwrap();
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn knn_mean_is_non_negative_and_uses_closest() {
        let index = PointIndex::build(&[(1.0, 0.0), (2.0, 0.0), (10.0, 0.0)]);
        let d = index.mean_knn_distance((0.0, 0.0), 2).unwrap();
        assert!((d - 1.5).abs() < 1e-12, "expected 1.5, got {d}");
    }
}
