#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Count regression and model evaluation.
//!
//! Assembles per-cell feature matrices, fits log-link Poisson
//! regressions by iteratively reweighted least squares, evaluates them
//! under random k-fold and leave-one-neighborhood-out cross-validation,
//! and compares the resulting risk surfaces against kernel-density
//! baselines on a held-out year.

pub mod compare;
pub mod cv;
pub mod glm;
pub mod matrix;

use thiserror::Error;

/// Errors that can occur during modeling and evaluation.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A statistics kernel failed.
    #[error(transparent)]
    Stats(#[from] riskgrid_stats::StatsError),

    /// The weighted least-squares system was singular (collinear
    /// features or a degenerate fold).
    #[error("Singular IRLS system; features are collinear")]
    SingularSystem,

    /// The target is all zeros; a log-link model cannot be initialized.
    #[error("Degenerate target: every cell count is zero")]
    DegenerateTarget,

    /// Two per-cell tables disagree on row count.
    #[error("Table length mismatch: {profiles} profiles vs {signals} signals")]
    TableLength {
        /// Rows in the profile table.
        profiles: usize,
        /// Rows in the signal table.
        signals: usize,
    },

    /// Two per-cell tables disagree on the cells they cover.
    #[error("Cell table mismatch at position {position}: {left} vs {right}")]
    CellMismatch {
        /// Row position of the first disagreement.
        position: usize,
        /// Cell id on the left table.
        left: u32,
        /// Cell id on the right table.
        right: u32,
    },

    /// A cross-validation fold left too few rows to fit the model.
    #[error("Fold '{fold}' leaves {rows} training rows for {parameters} parameters")]
    InsufficientTrainingRows {
        /// The held-out fold label.
        fold: String,
        /// Training rows remaining.
        rows: usize,
        /// Model parameter count.
        parameters: usize,
    },

    /// The held-out year has no events to distribute across categories.
    #[error("Holdout period contains no events")]
    EmptyHoldout,
}
