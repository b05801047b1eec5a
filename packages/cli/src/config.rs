//! Run configuration.
//!
//! The default configuration is embedded at compile time; `--config`
//! points at a TOML file overriding it wholesale. Validation happens
//! once at load so every stage can trust the values.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Embedded default configuration.
const DEFAULT_CONFIG_TOML: &str = include_str!("../riskgrid.toml");

/// Errors raised while loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the override file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing failed.
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value failed validation.
    #[error("Invalid config: {message}")]
    Invalid {
        /// What was wrong.
        message: String,
    },
}

/// Analysis run parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Calendar year the model is fit on.
    pub model_year: i32,
    /// Held-out comparison year.
    pub holdout_year: i32,
    /// Fishnet cell side length, US survey feet.
    pub cell_size_ft: f64,
    /// Nearest-neighbor count for the distance features.
    pub knn_k: usize,
    /// Random cross-validation fold count.
    pub folds: usize,
    /// Conditional permutations for Moran inference.
    pub permutations: usize,
    /// Shared RNG seed for folds and permutations.
    pub seed: u64,
    /// Significance threshold on the local statistic.
    pub significance: f64,
    /// Kernel-density search radii, US survey feet.
    pub kde_bandwidths_ft: Vec<f64>,
    /// Boundary layer id providing the leave-one-group-out partition.
    pub logo_layer: String,
}

impl RunConfig {
    /// Loads the configuration, from `path` when given, otherwise the
    /// embedded default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on read, parse, or validation failure.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let raw = match path {
            Some(path) => std::fs::read_to_string(path)?,
            None => DEFAULT_CONFIG_TOML.to_string(),
        };
        let config: Self = toml::de::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size_ft.is_finite() && self.cell_size_ft > 0.0) {
            return Err(ConfigError::Invalid {
                message: format!("cell_size_ft {} must be positive", self.cell_size_ft),
            });
        }
        if self.model_year == self.holdout_year {
            return Err(ConfigError::Invalid {
                message: "holdout_year must differ from model_year".to_string(),
            });
        }
        if self.knn_k == 0 {
            return Err(ConfigError::Invalid {
                message: "knn_k must be at least 1".to_string(),
            });
        }
        if self.folds < 2 {
            return Err(ConfigError::Invalid {
                message: format!("folds {} must be at least 2", self.folds),
            });
        }
        if self.permutations == 0 {
            return Err(ConfigError::Invalid {
                message: "permutations must be positive".to_string(),
            });
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(ConfigError::Invalid {
                message: format!("significance {} must be in (0, 1)", self.significance),
            });
        }
        if self.kde_bandwidths_ft.is_empty()
            || self
                .kde_bandwidths_ft
                .iter()
                .any(|&b| !(b.is_finite() && b > 0.0))
        {
            return Err(ConfigError::Invalid {
                message: "kde_bandwidths_ft must be non-empty and positive".to_string(),
            });
        }
        Ok(())
    }
}
