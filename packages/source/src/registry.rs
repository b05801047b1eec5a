//! Compile-time registry of data sources.
//!
//! Each entry is a `(name, toml_content)` pair embedded via
//! `include_str!`. Adding a dataset requires creating a TOML file in
//! `sources/` and adding a corresponding entry here.

use crate::source_def::{BoundarySource, SourceDefinition, SourceKind};

/// Number of registered point sources. Updated when new sources are
/// added. Enforced by a test.
#[cfg(test)]
const EXPECTED_POINT_SOURCE_COUNT: usize = 4;

/// Number of registered boundary layers. Enforced by a test.
#[cfg(test)]
const EXPECTED_BOUNDARY_SOURCE_COUNT: usize = 3;

/// Embedded TOML point-dataset definitions.
const POINT_SOURCE_TOMLS: &[(&str, &str)] = &[
    (
        "chicago_weapons",
        include_str!("../sources/chicago_weapons.toml"),
    ),
    (
        "abandoned_buildings",
        include_str!("../sources/abandoned_buildings.toml"),
    ),
    (
        "street_lights_out",
        include_str!("../sources/street_lights_out.toml"),
    ),
    (
        "gunshot_alerts",
        include_str!("../sources/gunshot_alerts.toml"),
    ),
];

/// Embedded TOML boundary-layer definitions.
const BOUNDARY_SOURCE_TOMLS: &[(&str, &str)] = &[
    ("city_boundary", include_str!("../sources/city_boundary.toml")),
    (
        "community_areas",
        include_str!("../sources/community_areas.toml"),
    ),
    (
        "police_districts",
        include_str!("../sources/police_districts.toml"),
    ),
];

/// Returns all registered point sources.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught during CI.
#[must_use]
pub fn point_sources() -> Vec<SourceDefinition> {
    POINT_SOURCE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse point source '{name}': {e}"))
        })
        .collect()
}

/// Returns all registered boundary layers.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse.
#[must_use]
pub fn boundary_sources() -> Vec<BoundarySource> {
    BOUNDARY_SOURCE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse boundary source '{name}': {e}"))
        })
        .collect()
}

/// Returns the single target-event source definition.
///
/// # Panics
///
/// Panics if the registry does not contain exactly one target source;
/// enforced by a test.
#[must_use]
pub fn target_source() -> SourceDefinition {
    let mut targets: Vec<SourceDefinition> = point_sources()
        .into_iter()
        .filter(|s| s.kind == SourceKind::TargetEvent)
        .collect();
    assert_eq!(
        targets.len(),
        1,
        "registry must define exactly one target-event source"
    );
    targets.remove(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_point_sources() {
        let sources = point_sources();
        assert_eq!(
            sources.len(),
            EXPECTED_POINT_SOURCE_COUNT,
            "Expected {EXPECTED_POINT_SOURCE_COUNT} point sources, found {}. \
             Update EXPECTED_POINT_SOURCE_COUNT after adding/removing sources.",
            sources.len()
        );
    }

    #[test]
    fn loads_all_boundary_sources() {
        let sources = boundary_sources();
        assert_eq!(
            sources.len(),
            EXPECTED_BOUNDARY_SOURCE_COUNT,
            "Expected {EXPECTED_BOUNDARY_SOURCE_COUNT} boundary sources, found {}.",
            sources.len()
        );
    }

    #[test]
    fn point_source_ids_are_unique() {
        let sources = point_sources();
        let mut seen = BTreeSet::new();
        for source in &sources {
            assert!(seen.insert(&source.id), "Duplicate source ID: {}", source.id);
        }
    }

    #[test]
    fn exactly_one_target_source() {
        let targets = point_sources()
            .into_iter()
            .filter(|s| s.kind == SourceKind::TargetEvent)
            .count();
        assert_eq!(targets, 1);
    }

    #[test]
    fn every_risk_factor_layer_has_a_source() {
        let covered: BTreeSet<_> = point_sources()
            .iter()
            .filter_map(|s| s.kind.risk_factor())
            .collect();
        for kind in riskgrid_models::RiskFactorKind::all() {
            assert!(
                covered.contains(kind),
                "No point source feeds risk factor {kind:?}"
            );
        }
    }

    #[test]
    fn all_sources_have_required_fields() {
        for source in &point_sources() {
            assert!(!source.id.is_empty(), "Source has empty id");
            assert!(!source.name.is_empty(), "Source {} has empty name", source.id);
            assert!(
                source.api_url.starts_with("https://"),
                "Source {} has non-https api_url",
                source.id
            );
            assert!(
                !source.date_column.is_empty(),
                "Source {} has empty date column",
                source.id
            );
            assert!(source.page_size > 0, "Source {} has zero page size", source.id);
        }
    }

    #[test]
    fn boundary_sources_name_or_fixed() {
        for source in &boundary_sources() {
            assert!(
                source.name_property.is_some() || source.fixed_name.is_some(),
                "Boundary {} has neither name_property nor fixed_name",
                source.id
            );
        }
    }
}
