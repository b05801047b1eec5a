#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Shared domain types for the riskgrid toolchain.
//!
//! This crate defines the canonical types passed between pipeline stages:
//! normalized event points, risk-factor layers, named boundary polygons,
//! per-cell feature tables, and the ordinal risk-category scale. All
//! downstream crates key their derived tables on the grid-cell id defined
//! here.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Ordinal risk category, from 1st (lowest) to 5th (highest).
///
/// Categories are produced by natural-breaks classification of a
/// continuous risk surface (kernel density or model prediction).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    /// 1st: lowest risk
    First = 1,
    /// 2nd
    Second = 2,
    /// 3rd
    Third = 3,
    /// 4th
    Fourth = 4,
    /// 5th: highest risk
    Fifth = 5,
}

impl RiskCategory {
    /// Returns the numeric rank of this category (1-5).
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a category from a numeric rank.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 1-5.
    pub const fn from_value(value: u8) -> Result<Self, InvalidRiskCategoryError> {
        match value {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            3 => Ok(Self::Third),
            4 => Ok(Self::Fourth),
            5 => Ok(Self::Fifth),
            _ => Err(InvalidRiskCategoryError { value }),
        }
    }

    /// Short ordinal label used in artifact tables (`"1st"` .. `"5th"`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::First => "1st",
            Self::Second => "2nd",
            Self::Third => "3rd",
            Self::Fourth => "4th",
            Self::Fifth => "5th",
        }
    }

    /// Returns all categories in ascending order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::First,
            Self::Second,
            Self::Third,
            Self::Fourth,
            Self::Fifth,
        ]
    }
}

/// Error returned when attempting to create a [`RiskCategory`] from an
/// invalid numeric rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRiskCategoryError {
    /// The invalid rank that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidRiskCategoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid risk category {}: expected 1-5", self.value)
    }
}

impl std::error::Error for InvalidRiskCategoryError {}

/// Auxiliary risk-factor layers joined onto the grid.
///
/// Each variant corresponds to one independent municipal point dataset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskFactorKind {
    /// 311 reports of vacant or abandoned buildings
    AbandonedBuilding,
    /// 311 reports of street lights out
    StreetLightOutage,
    /// Acoustic gunshot sensor alerts
    GunshotAlert,
}

impl RiskFactorKind {
    /// Returns all risk-factor layers in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::AbandonedBuilding,
            Self::StreetLightOutage,
            Self::GunshotAlert,
        ]
    }

    /// Column-name stem used in artifact tables (e.g. `"abandoned_building"`).
    #[must_use]
    pub const fn column_stem(self) -> &'static str {
        match self {
            Self::AbandonedBuilding => "abandoned_building",
            Self::StreetLightOutage => "street_light_outage",
            Self::GunshotAlert => "gunshot_alert",
        }
    }
}

/// A single normalized point record from any source dataset.
///
/// Coordinates are WGS84 longitude/latitude as delivered by the portal;
/// projection to the planar analysis CRS happens downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPoint {
    /// WGS84 longitude in decimal degrees.
    pub longitude: f64,
    /// WGS84 latitude in decimal degrees.
    pub latitude: f64,
    /// Timestamp of the event in portal-local civil time.
    pub occurred_at: NaiveDateTime,
}

/// A named boundary polygon (city limits, community area, police district).
#[derive(Debug, Clone, PartialEq)]
pub struct NamedBoundary {
    /// Boundary name (community-area name, district number, etc.).
    pub name: String,
    /// Boundary geometry in the coordinate system of its container.
    pub polygon: MultiPolygon<f64>,
}

/// Per-cell counts and proximity features produced by the aggregation
/// stage. One row per grid cell, keyed by cell id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellProfile {
    /// Grid-cell id (dense, 1-based).
    pub cell_id: u32,
    /// Target-event count for the model year.
    pub event_count: u32,
    /// Raw point count per risk-factor layer.
    pub factor_counts: BTreeMap<RiskFactorKind, u32>,
    /// Mean planar distance from the cell centroid to its k nearest
    /// points of each risk-factor layer, in feet.
    pub factor_nn_distance: BTreeMap<RiskFactorKind, f64>,
    /// Community-area name containing the cell centroid, if any.
    pub neighborhood: Option<String>,
}

/// Per-cell spatial-dependence diagnostics produced from the event
/// surface. One row per grid cell, keyed by cell id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialSignal {
    /// Grid-cell id (dense, 1-based).
    pub cell_id: u32,
    /// Local Moran's I statistic for the cell.
    pub local_i: f64,
    /// Conditional-permutation pseudo p-value for the statistic.
    pub p_value: f64,
    /// Whether the cell is part of a statistically significant cluster.
    pub significant: bool,
    /// Planar distance from the cell centroid to the nearest significant
    /// cluster cell, in feet. Zero when no cell is significant.
    pub cluster_distance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_category_from_value_roundtrip() {
        for v in 1..=5u8 {
            let cat = RiskCategory::from_value(v).unwrap();
            assert_eq!(cat.value(), v);
        }
        assert!(RiskCategory::from_value(0).is_err());
        assert!(RiskCategory::from_value(6).is_err());
    }

    #[test]
    fn risk_categories_are_ordered() {
        let all = RiskCategory::all();
        for pair in all.windows(2) {
            assert!(
                pair[0] < pair[1],
                "{:?} should sort below {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn factor_column_stems_are_unique() {
        let stems: std::collections::BTreeSet<_> = RiskFactorKind::all()
            .iter()
            .map(|k| k.column_stem())
            .collect();
        assert_eq!(
            stems.len(),
            RiskFactorKind::all().len(),
            "Duplicate risk-factor column stem"
        );
    }
}
