#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Spatial statistics over the fishnet grid.
//!
//! Queen-contiguity weights, local and global Moran's I with
//! conditional-permutation inference, Fisher-Jenks natural-breaks
//! classification, and quartic kernel density estimation. Every
//! statistic takes plain slices ordered by cell id so callers stay
//! decoupled from the grid representation.

pub mod breaks;
pub mod kde;
pub mod lisa;
pub mod moran;
pub mod weights;

use thiserror::Error;

/// Errors that can occur during statistical computation.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Two parallel per-cell slices disagree on length.
    #[error("Length mismatch: {left} values vs {right} units")]
    LengthMismatch {
        /// Length of the value slice.
        left: usize,
        /// Length of the spatial-unit collection.
        right: usize,
    },

    /// A kernel bandwidth must be a positive, finite length.
    #[error("Invalid bandwidth {value}: must be positive and finite")]
    InvalidBandwidth {
        /// The rejected bandwidth, in feet.
        value: f64,
    },

    /// Classification was asked for more classes than values.
    #[error("Cannot split {values} values into {classes} classes")]
    TooFewValues {
        /// Number of input values.
        values: usize,
        /// Number of requested classes.
        classes: usize,
    },

    /// A statistic requires at least one permutation.
    #[error("Permutation count must be positive")]
    NoPermutations,
}
