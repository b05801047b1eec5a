#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Artifact generation for the riskgrid pipeline.
//!
//! Writes the machine-readable outputs of a run: per-cell feature and
//! prediction tables as CSV, the fishnet with joined attributes as
//! `GeoJSON` (planar coordinates), and a JSON run summary. These are
//! the inputs to downstream plotting, not presentation artifacts
//! themselves.

pub mod geo_out;
pub mod tables;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Output filename for the per-cell feature table.
pub const OUTPUT_CELL_FEATURES: &str = "cell_features.csv";

/// Output filename for the out-of-fold prediction table.
pub const OUTPUT_PREDICTIONS: &str = "predictions.csv";

/// Output filename for the MAE summary table.
pub const OUTPUT_MAE_SUMMARY: &str = "mae_summary.csv";

/// Output filename for the holdout capture-rate comparison table.
pub const OUTPUT_CAPTURE_COMPARISON: &str = "capture_comparison.csv";

/// Output filename for the residual autocorrelation table.
pub const OUTPUT_RESIDUAL_MORAN: &str = "residual_moran.csv";

/// Output filename for the fishnet `GeoJSON`.
pub const OUTPUT_FISHNET_GEOJSON: &str = "fishnet.geojson";

/// Output filename for the run summary JSON.
pub const OUTPUT_RUN_SUMMARY: &str = "run_summary.json";

/// Errors that can occur while writing artifacts.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returns the generated-artifact directory under the workspace root.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR` so output paths
/// are stable regardless of the caller's working directory.
///
/// # Panics
///
/// Panics if the project root cannot be resolved from
/// `CARGO_MANIFEST_DIR`.
#[must_use]
pub fn output_dir() -> PathBuf {
    workspace_root().join("data/generated")
}

/// Returns the raw-download directory under the workspace root.
///
/// # Panics
///
/// Panics if the project root cannot be resolved from
/// `CARGO_MANIFEST_DIR`.
#[must_use]
pub fn raw_data_dir() -> PathBuf {
    workspace_root().join("data/raw")
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Top-level description of a completed run, written as JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Year the model was fit on.
    pub model_year: i32,
    /// Held-out comparison year.
    pub holdout_year: i32,
    /// Grid cell side length, feet.
    pub cell_size_ft: f64,
    /// Number of fishnet cells.
    pub cell_count: usize,
    /// Total model-year target events falling on the grid.
    pub event_total: u64,
    /// Total holdout-year target events falling on the grid.
    pub holdout_event_total: u64,
    /// Cells flagged as significant clusters.
    pub significant_cells: usize,
    /// Per-scheme, per-feature-set MAE summaries.
    pub mae_summaries: Vec<riskgrid_analytics::cv::MaeSummary>,
}

/// Writes the run summary JSON.
///
/// # Errors
///
/// Returns [`GenerateError`] on serialization or I/O failure.
pub fn write_run_summary(dir: &Path, summary: &RunSummary) -> Result<PathBuf, GenerateError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(OUTPUT_RUN_SUMMARY);
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(&path, json)?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}
