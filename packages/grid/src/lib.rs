#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Fishnet grid construction and point-to-cell aggregation.
//!
//! Tiles the projected city boundary into fixed-size square cells, then
//! derives the per-cell feature table: target-event counts, risk-factor
//! counts, nearest-neighbor distance features, and the community-area
//! assignment used for spatial cross-validation. All derived tables are
//! keyed by the cell id assigned at construction.

pub mod aggregate;
pub mod features;
pub mod fishnet;

use thiserror::Error;

pub use fishnet::{Fishnet, GridCell};

/// Errors that can occur during grid operations.
#[derive(Debug, Error)]
pub enum GridError {
    /// The requested cell size is not a positive length.
    #[error("Invalid cell size {size}: must be positive")]
    InvalidCellSize {
        /// The rejected cell size, in feet.
        size: f64,
    },

    /// The boundary polygon has no extent to tile.
    #[error("Boundary polygon is empty")]
    EmptyBoundary,

    /// A spatial index operation failed.
    #[error(transparent)]
    Spatial(#[from] riskgrid_spatial::SpatialError),
}
