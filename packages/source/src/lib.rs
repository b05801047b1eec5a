#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Open-data source definitions, fetching, and normalization.
//!
//! Each dataset the pipeline consumes is described by a TOML definition
//! embedded at compile time: the Socrata endpoint, its date and
//! coordinate columns, and an optional server-side filter. A single
//! generic fetcher handles all point datasets, and a `GeoJSON` export
//! fetcher handles the boundary layers.

pub mod boundaries;
pub mod normalize;
pub mod progress;
pub mod registry;
pub mod socrata;
pub mod source_def;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during data source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data normalization or conversion error.
    #[error("Normalization error: {message}")]
    Normalization {
        /// Description of what went wrong.
        message: String,
    },

    /// A fetch produced zero usable records, which is fatal for a
    /// single-run batch analysis.
    #[error("Source '{source_id}' returned no records")]
    EmptyResult {
        /// The id of the source that came back empty.
        source_id: String,
    },
}

/// Configuration for fetching data from a source.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Restrict the fetch to events occurring within this calendar year.
    pub year: Option<i32>,
    /// Maximum number of records to fetch.
    pub limit: Option<u64>,
    /// Directory to store downloaded files.
    pub output_dir: PathBuf,
}
