//! Fishnet `GeoJSON` writer.
//!
//! Serializes every grid cell with its joined attributes and the
//! out-of-fold predictions from each evaluation. Coordinates stay in
//! the planar analysis CRS; the feature properties carry everything a
//! mapping frontend needs to reproduce the report figures.

use std::collections::BTreeMap;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use riskgrid_analytics::cv::CvOutcome;
use riskgrid_grid::Fishnet;
use riskgrid_models::{CellProfile, RiskFactorKind, SpatialSignal};

use crate::{GenerateError, OUTPUT_FISHNET_GEOJSON};

/// Writes the fishnet with joined attributes as a `GeoJSON` feature
/// collection.
///
/// # Errors
///
/// Returns [`GenerateError`] on I/O or serialization failure.
pub fn write_fishnet(
    dir: &Path,
    fishnet: &Fishnet,
    profiles: &[CellProfile],
    signals: &[SpatialSignal],
    outcomes: &[CvOutcome],
) -> Result<PathBuf, GenerateError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(OUTPUT_FISHNET_GEOJSON);

    // Pre-index predictions: evaluation label -> cell id -> prediction.
    let mut prediction_columns: BTreeMap<String, BTreeMap<u32, f64>> = BTreeMap::new();
    for outcome in outcomes {
        let label = format!("pred_{}_{}", outcome.scheme, outcome.feature_set);
        let by_cell = outcome
            .predictions
            .iter()
            .map(|p| (p.cell_id, p.predicted))
            .collect();
        prediction_columns.insert(label, by_cell);
    }

    let features: Vec<Feature> = fishnet
        .cells()
        .iter()
        .zip(profiles.iter().zip(signals))
        .map(|(cell, (profile, signal))| {
            let mut properties = JsonObject::new();
            properties.insert("cell_id".to_string(), JsonValue::from(cell.id));
            properties.insert(
                "event_count".to_string(),
                JsonValue::from(profile.event_count),
            );
            for kind in RiskFactorKind::all() {
                properties.insert(
                    format!("{}_count", kind.column_stem()),
                    JsonValue::from(profile.factor_counts.get(kind).copied().unwrap_or(0)),
                );
                properties.insert(
                    format!("{}_nn_ft", kind.column_stem()),
                    JsonValue::from(
                        profile.factor_nn_distance.get(kind).copied().unwrap_or(0.0),
                    ),
                );
            }
            properties.insert("local_i".to_string(), JsonValue::from(signal.local_i));
            properties.insert("p_value".to_string(), JsonValue::from(signal.p_value));
            properties.insert(
                "significant".to_string(),
                JsonValue::from(signal.significant),
            );
            properties.insert(
                "cluster_distance_ft".to_string(),
                JsonValue::from(signal.cluster_distance),
            );
            if let Some(neighborhood) = &profile.neighborhood {
                properties.insert(
                    "neighborhood".to_string(),
                    JsonValue::from(neighborhood.clone()),
                );
            }
            for (label, by_cell) in &prediction_columns {
                if let Some(&predicted) = by_cell.get(&cell.id) {
                    properties.insert(label.clone(), JsonValue::from(predicted));
                }
            }

            Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&cell.polygon))),
                id: Some(geojson::feature::Id::Number(cell.id.into())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection = geojson::GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    });

    let file = std::fs::File::create(&path)?;
    let mut writer = BufWriter::new(file);
    write!(writer, "{collection}")?;
    writer.flush()?;

    log::info!("Wrote {}", path.display());
    Ok(path)
}
