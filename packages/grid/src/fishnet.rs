//! Regular square-grid ("fishnet") construction over a boundary polygon.
//!
//! Cells are axis-aligned squares covering the boundary's bounding
//! extent, filtered to those intersecting the boundary itself. Cells
//! that only partially overlap the boundary are retained whole, not
//! clipped, so every cell has identical area. Ids form a dense 1-based
//! sequence in row-major order and are never reassigned afterwards.

use geo::{BoundingRect, Coord, Intersects, MultiPolygon, Polygon, Rect};
use riskgrid_spatial::CellIndex;

use crate::GridError;

/// One square grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    /// Dense 1-based cell id, stable across all later joins.
    pub id: u32,
    /// The square cell polygon, planar feet.
    pub polygon: Polygon<f64>,
    /// The cell's center point, planar feet.
    pub centroid: Coord<f64>,
}

/// A fishnet grid over the study-area boundary.
pub struct Fishnet {
    cell_size: f64,
    cells: Vec<GridCell>,
}

impl Fishnet {
    /// Tiles `boundary` with square cells of side `cell_size` (feet).
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidCellSize`] for non-positive sizes and
    /// [`GridError::EmptyBoundary`] if the boundary has no extent.
    pub fn build(boundary: &MultiPolygon<f64>, cell_size: f64) -> Result<Self, GridError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(GridError::InvalidCellSize { size: cell_size });
        }
        let extent = boundary.bounding_rect().ok_or(GridError::EmptyBoundary)?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cols = ((extent.width() / cell_size).ceil() as usize).max(1);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rows = ((extent.height() / cell_size).ceil() as usize).max(1);

        // Shared edge coordinates are computed once so adjacent cells
        // carry bit-identical boundaries; queen contiguity and
        // edge-point containment both rely on exact touching.
        #[allow(clippy::cast_precision_loss)]
        let column_edges: Vec<f64> = (0..=cols)
            .map(|col| extent.min().x + col as f64 * cell_size)
            .collect();
        #[allow(clippy::cast_precision_loss)]
        let row_edges: Vec<f64> = (0..=rows)
            .map(|row| extent.min().y + row as f64 * cell_size)
            .collect();

        let mut cells = Vec::new();
        let mut next_id: u32 = 1;

        for row in 0..rows {
            for col in 0..cols {
                let rect = Rect::new(
                    Coord {
                        x: column_edges[col],
                        y: row_edges[row],
                    },
                    Coord {
                        x: column_edges[col + 1],
                        y: row_edges[row + 1],
                    },
                );
                let polygon = rect.to_polygon();

                if boundary.intersects(&polygon) {
                    cells.push(GridCell {
                        id: next_id,
                        polygon,
                        centroid: rect.center(),
                    });
                    next_id += 1;
                }
            }
        }

        if cells.is_empty() {
            return Err(GridError::EmptyBoundary);
        }

        log::info!(
            "Fishnet: {} cells of {cell_size} ft over a {cols}x{rows} extent",
            cells.len()
        );
        Ok(Self { cell_size, cells })
    }

    /// Cell side length in feet.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// All cells, ordered by id.
    #[must_use]
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the grid holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell centroids ordered by id.
    #[must_use]
    pub fn centroids(&self) -> Vec<Coord<f64>> {
        self.cells.iter().map(|c| c.centroid).collect()
    }

    /// Builds the R-tree lookup index over this grid's cells.
    ///
    /// # Errors
    ///
    /// Propagates [`riskgrid_spatial::SpatialError`] on degenerate cell
    /// geometry (cannot happen for cells built here).
    pub fn build_index(&self) -> Result<CellIndex, GridError> {
        let entries: Vec<(u32, Polygon<f64>)> = self
            .cells
            .iter()
            .map(|c| (c.id, c.polygon.clone()))
            .collect();
        Ok(CellIndex::build(&entries)?)
    }
}
