#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Planar projection and in-memory spatial indexes.
//!
//! Projects WGS84 points and boundaries into the State Plane Illinois
//! East coordinate system (US survey feet), builds R-tree indexes over
//! grid cells and region polygons, and provides fast point-in-polygon
//! and nearest-neighbor lookups. Used by the grid aggregation and
//! feature stages.

pub mod crs;
pub mod knn;

use geo::{BoundingRect, Intersects, MultiPolygon, Polygon};
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;

/// Errors that can occur during spatial operations.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// A nearest-neighbor query was made against an empty reference set.
    #[error("Nearest-neighbor query against an empty reference set")]
    EmptyReferenceSet,

    /// A polygon had no computable bounding rectangle (empty geometry).
    #[error("Empty geometry: {context}")]
    EmptyGeometry {
        /// What was being indexed when the empty geometry was found.
        context: String,
    },
}

/// A grid-cell polygon stored in the R-tree with its id.
struct CellEntry {
    id: u32,
    envelope: AABB<[f64; 2]>,
    polygon: Polygon<f64>,
}

impl RTreeObject for CellEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built R-tree index over grid-cell polygons.
///
/// Constructed once per fishnet and shared across all aggregation
/// passes. Lookups test the closed polygon boundary, so a point lying
/// exactly on a shared cell edge is attributed to exactly one cell
/// (the first candidate that covers it).
pub struct CellIndex {
    tree: RTree<CellEntry>,
}

impl CellIndex {
    /// Builds the index from `(cell id, polygon)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::EmptyGeometry`] if any cell polygon has no
    /// bounding rectangle.
    pub fn build(cells: &[(u32, Polygon<f64>)]) -> Result<Self, SpatialError> {
        let mut entries = Vec::with_capacity(cells.len());

        for (id, polygon) in cells {
            let rect = polygon
                .bounding_rect()
                .ok_or_else(|| SpatialError::EmptyGeometry {
                    context: format!("grid cell {id}"),
                })?;
            entries.push(CellEntry {
                id: *id,
                envelope: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
                polygon: polygon.clone(),
            });
        }

        log::debug!("Built cell index over {} cells", entries.len());
        Ok(Self {
            tree: RTree::bulk_load(entries),
        })
    }

    /// Look up the id of the cell covering a point.
    ///
    /// Returns `None` for points outside every cell.
    #[must_use]
    pub fn lookup(&self, x: f64, y: f64) -> Option<u32> {
        let point = geo::Point::new(x, y);
        let query_env = AABB::from_point([x, y]);

        for entry in self.tree.locate_in_envelope_intersecting(&query_env) {
            if entry.polygon.intersects(&point) {
                return Some(entry.id);
            }
        }
        None
    }
}

/// A named region polygon stored in the R-tree.
struct RegionEntry {
    name: String,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for RegionEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built R-tree index over named region polygons (community areas,
/// police districts).
///
/// Regions tile the city without overlap, so first match wins.
pub struct RegionIndex {
    tree: RTree<RegionEntry>,
}

impl RegionIndex {
    /// Builds the index from `(name, polygon)` pairs.
    ///
    /// Regions with empty geometry are skipped with a warning rather
    /// than failing the build.
    #[must_use]
    pub fn build(regions: &[(String, MultiPolygon<f64>)]) -> Self {
        let mut entries = Vec::with_capacity(regions.len());

        for (name, polygon) in regions {
            let Some(rect) = polygon.bounding_rect() else {
                log::warn!("Skipping region '{name}' with empty geometry");
                continue;
            };
            entries.push(RegionEntry {
                name: name.clone(),
                envelope: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
                polygon: polygon.clone(),
            });
        }

        log::debug!("Built region index over {} regions", entries.len());
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Look up the name of the region covering a point.
    #[must_use]
    pub fn lookup(&self, x: f64, y: f64) -> Option<&str> {
        let point = geo::Point::new(x, y);
        let query_env = AABB::from_point([x, y]);

        for entry in self.tree.locate_in_envelope_intersecting(&query_env) {
            if entry.polygon.intersects(&point) {
                return Some(&entry.name);
            }
        }
        None
    }
}
