//! Socrata `GeoJSON` export fetching and boundary normalization.
//!
//! Boundary layers (city limits, community areas, police districts) are
//! served as `GeoJSON` feature collections from the portal's
//! `resource.geojson` endpoint with a `$limit` parameter. Features are
//! normalized into [`NamedBoundary`] values, with `Polygon` and
//! `MultiPolygon` geometries both accepted.

use std::path::{Path, PathBuf};

use geo::MultiPolygon;
use geojson::GeoJson;
use riskgrid_models::NamedBoundary;

use crate::source_def::BoundarySource;
use crate::{FetchOptions, SourceError};

/// Record cap for boundary layers; Chicago's largest has 77 features.
const BOUNDARY_LIMIT: u32 = 5000;

/// Fetches a boundary layer's `GeoJSON` export, writes it under
/// `options.output_dir`, and returns the output path.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails or the response is not a
/// feature collection.
pub async fn fetch_boundary(
    client: &reqwest::Client,
    source: &BoundarySource,
    options: &FetchOptions,
) -> Result<PathBuf, SourceError> {
    let output_path = options.output_dir.join(source.output_filename());
    std::fs::create_dir_all(&options.output_dir)?;

    let full_url = if source.url.contains('?') {
        format!("{}&$limit={BOUNDARY_LIMIT}", source.url)
    } else {
        format!("{}?$limit={BOUNDARY_LIMIT}", source.url)
    };

    log::info!("Fetching boundary layer {}", source.id);
    let resp = client.get(&full_url).send().await?;
    if !resp.status().is_success() {
        return Err(SourceError::Normalization {
            message: format!(
                "Boundary request for '{}' failed with status {}",
                source.id,
                resp.status()
            ),
        });
    }
    let body = resp.text().await?;

    // Validate up front so a bad payload fails the fetch, not the run.
    let parsed: serde_json::Value = serde_json::from_str(&body)?;
    if parsed["features"].as_array().is_none() {
        return Err(SourceError::Normalization {
            message: format!("No features array in {} GeoJSON response", source.id),
        });
    }

    std::fs::write(&output_path, &body)?;
    Ok(output_path)
}

/// Loads a previously fetched boundary file and normalizes its features.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or contains no
/// usable polygon features.
pub fn load_boundaries(
    path: &Path,
    source: &BoundarySource,
) -> Result<Vec<NamedBoundary>, SourceError> {
    let body = std::fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&body)?;

    let features = json["features"]
        .as_array()
        .ok_or_else(|| SourceError::Normalization {
            message: format!("No features array in {}", path.display()),
        })?;

    let boundaries: Vec<NamedBoundary> = features
        .iter()
        .filter_map(|feature| normalize_feature(feature, source))
        .collect();

    if boundaries.is_empty() {
        return Err(SourceError::EmptyResult {
            source_id: source.id.clone(),
        });
    }

    log::info!(
        "Loaded {} boundaries from layer {}",
        boundaries.len(),
        source.id
    );
    Ok(boundaries)
}

/// Normalizes a single `GeoJSON` feature, skipping features with missing
/// names or non-polygon geometry.
fn normalize_feature(
    feature: &serde_json::Value,
    source: &BoundarySource,
) -> Option<NamedBoundary> {
    let name = match (&source.name_property, &source.fixed_name) {
        (Some(prop), _) => feature
            .get("properties")?
            .get(prop)
            .and_then(property_as_name)?,
        (None, Some(fixed)) => fixed.clone(),
        (None, None) => return None,
    };

    let geometry = feature.get("geometry")?;
    if geometry.is_null() {
        return None;
    }
    let polygon = parse_geojson_to_multipolygon(&geometry.to_string())?;

    Some(NamedBoundary { name, polygon })
}

/// Region names arrive as strings ("AUSTIN") or numbers (district 11).
fn property_as_name(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a `GeoJSON` string into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
#[must_use]
pub fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = geojson_str.parse().ok()?;
    if let GeoJson::Geometry(geom) = geojson {
        let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
        match geo_geom {
            geo::Geometry::MultiPolygon(mp) => Some(mp),
            geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
            _ => None,
        }
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn community_source() -> BoundarySource {
        BoundarySource {
            id: "community_areas".to_string(),
            name: "Community Areas".to_string(),
            url: "https://example.test/resource/abcd.geojson".to_string(),
            name_property: Some("community".to_string()),
            fixed_name: None,
        }
    }

    #[test]
    fn normalizes_polygon_feature_with_name() {
        let feature = serde_json::json!({
            "type": "Feature",
            "properties": { "community": "AUSTIN" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
            }
        });

        let boundary = normalize_feature(&feature, &community_source()).unwrap();
        assert_eq!(boundary.name, "AUSTIN");
        assert_eq!(boundary.polygon.0.len(), 1);
    }

    #[test]
    fn numeric_names_are_accepted() {
        let feature = serde_json::json!({
            "type": "Feature",
            "properties": { "community": 11 },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
            }
        });

        let boundary = normalize_feature(&feature, &community_source()).unwrap();
        assert_eq!(boundary.name, "11");
    }

    #[test]
    fn fixed_name_applies_when_no_property() {
        let source = BoundarySource {
            id: "city_boundary".to_string(),
            name: "City Boundary".to_string(),
            url: "https://example.test/resource/wxyz.geojson".to_string(),
            name_property: None,
            fixed_name: Some("CHICAGO".to_string()),
        };
        let feature = serde_json::json!({
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]]
            }
        });

        let boundary = normalize_feature(&feature, &source).unwrap();
        assert_eq!(boundary.name, "CHICAGO");
    }

    #[test]
    fn features_without_geometry_are_skipped() {
        let feature = serde_json::json!({
            "type": "Feature",
            "properties": { "community": "AUSTIN" },
            "geometry": null
        });
        assert!(normalize_feature(&feature, &community_source()).is_none());
    }
}
