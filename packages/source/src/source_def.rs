//! Config-driven point-dataset and boundary-dataset definitions.
//!
//! [`SourceDefinition`] captures everything unique about a Socrata point
//! dataset in a serializable config struct; [`BoundarySource`] does the
//! same for polygon layers. One generic fetcher implementation handles
//! every definition, eliminating per-dataset boilerplate.

use riskgrid_models::RiskFactorKind;
use serde::Deserialize;

/// What role a point dataset plays in the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The modeled outcome (weapons-violation incidents).
    TargetEvent,
    /// 311 reports of vacant or abandoned buildings.
    AbandonedBuilding,
    /// 311 reports of street lights out.
    StreetLightOutage,
    /// Acoustic gunshot sensor alerts.
    GunshotAlert,
}

impl SourceKind {
    /// The risk-factor layer this source feeds, or `None` for the
    /// target-event source.
    #[must_use]
    pub const fn risk_factor(self) -> Option<RiskFactorKind> {
        match self {
            Self::TargetEvent => None,
            Self::AbandonedBuilding => Some(RiskFactorKind::AbandonedBuilding),
            Self::StreetLightOutage => Some(RiskFactorKind::StreetLightOutage),
            Self::GunshotAlert => Some(RiskFactorKind::GunshotAlert),
        }
    }
}

/// A complete, config-driven Socrata point-dataset definition.
///
/// Loaded from TOML files at compile time and used as the sole source
/// implementation.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"chicago_weapons"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Role of this dataset in the analysis.
    pub kind: SourceKind,
    /// Base Socrata API URL (`.../resource/<dataset>.json`).
    pub api_url: String,
    /// Date column used for ordering and year filtering.
    pub date_column: String,
    /// Column holding WGS84 latitude.
    pub latitude_column: String,
    /// Column holding WGS84 longitude.
    pub longitude_column: String,
    /// Optional server-side `$where` filter (e.g., a category restriction).
    #[serde(default)]
    pub where_clause: Option<String>,
    /// Records per page.
    pub page_size: u64,
    /// Output filename stem; the fetch year is appended before the
    /// extension (e.g., `chicago_weapons_2017.json`).
    pub output_stem: String,
}

impl SourceDefinition {
    /// Raw-file name for a fetch of this source restricted to `year`.
    #[must_use]
    pub fn output_filename(&self, year: Option<i32>) -> String {
        year.map_or_else(
            || format!("{}.json", self.output_stem),
            |y| format!("{}_{y}.json", self.output_stem),
        )
    }
}

/// A polygon boundary layer served from a Socrata `GeoJSON` export.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundarySource {
    /// Unique identifier (e.g., `"community_areas"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Socrata `resource.geojson` export URL.
    pub url: String,
    /// Feature property holding the region name. When absent,
    /// `fixed_name` is applied to every feature.
    #[serde(default)]
    pub name_property: Option<String>,
    /// Name to assign when the layer has no name property (single-polygon
    /// layers such as the city boundary).
    #[serde(default)]
    pub fixed_name: Option<String>,
}

impl BoundarySource {
    /// Raw-file name for a fetch of this boundary layer.
    #[must_use]
    pub fn output_filename(&self) -> String {
        format!("{}.geojson", self.id)
    }
}
