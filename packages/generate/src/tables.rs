//! CSV table writers.
//!
//! Every table carries an explicit header row and one record per line;
//! columns for the risk-factor layers are generated from the canonical
//! layer ordering so the schema stays stable as layers are added.

use std::path::{Path, PathBuf};

use riskgrid_analytics::compare::{CaptureRow, ResidualMoranRow};
use riskgrid_analytics::cv::{CvOutcome, MaeSummary};
use riskgrid_models::{CellProfile, RiskFactorKind, SpatialSignal};

use crate::{
    GenerateError, OUTPUT_CAPTURE_COMPARISON, OUTPUT_CELL_FEATURES, OUTPUT_MAE_SUMMARY,
    OUTPUT_PREDICTIONS, OUTPUT_RESIDUAL_MORAN,
};

/// Writes the joined per-cell feature table.
///
/// `profiles` and `signals` must be row-aligned by cell id.
///
/// # Errors
///
/// Returns [`GenerateError`] on I/O or serialization failure.
pub fn write_cell_features(
    dir: &Path,
    profiles: &[CellProfile],
    signals: &[SpatialSignal],
) -> Result<PathBuf, GenerateError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(OUTPUT_CELL_FEATURES);
    let mut writer = csv::Writer::from_path(&path)?;

    let mut header = vec!["cell_id".to_string(), "event_count".to_string()];
    for kind in RiskFactorKind::all() {
        header.push(format!("{}_count", kind.column_stem()));
    }
    for kind in RiskFactorKind::all() {
        header.push(format!("{}_nn_ft", kind.column_stem()));
    }
    header.extend(
        [
            "local_i",
            "p_value",
            "significant",
            "cluster_distance_ft",
            "neighborhood",
        ]
        .map(String::from),
    );
    writer.write_record(&header)?;

    for (profile, signal) in profiles.iter().zip(signals) {
        let mut record = vec![
            profile.cell_id.to_string(),
            profile.event_count.to_string(),
        ];
        for kind in RiskFactorKind::all() {
            record.push(
                profile
                    .factor_counts
                    .get(kind)
                    .copied()
                    .unwrap_or(0)
                    .to_string(),
            );
        }
        for kind in RiskFactorKind::all() {
            record.push(format!(
                "{:.2}",
                profile.factor_nn_distance.get(kind).copied().unwrap_or(0.0)
            ));
        }
        record.push(format!("{:.6}", signal.local_i));
        record.push(format!("{:.4}", signal.p_value));
        record.push(signal.significant.to_string());
        record.push(format!("{:.2}", signal.cluster_distance));
        record.push(profile.neighborhood.clone().unwrap_or_default());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}

/// Writes every out-of-fold prediction from all evaluations.
///
/// # Errors
///
/// Returns [`GenerateError`] on I/O or serialization failure.
pub fn write_predictions(dir: &Path, outcomes: &[CvOutcome]) -> Result<PathBuf, GenerateError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(OUTPUT_PREDICTIONS);
    let mut writer = csv::Writer::from_path(&path)?;

    writer.write_record([
        "scheme",
        "feature_set",
        "cell_id",
        "fold",
        "actual",
        "predicted",
        "error",
    ])?;

    for outcome in outcomes {
        for prediction in &outcome.predictions {
            writer.write_record([
                outcome.scheme.to_string(),
                outcome.feature_set.to_string(),
                prediction.cell_id.to_string(),
                prediction.fold.clone(),
                format!("{:.0}", prediction.actual),
                format!("{:.4}", prediction.predicted),
                format!("{:.4}", prediction.error()),
            ])?;
        }
    }

    writer.flush()?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}

/// Writes the MAE summary table (mean and sd per scheme x feature set).
///
/// # Errors
///
/// Returns [`GenerateError`] on I/O or serialization failure.
pub fn write_mae_summary(
    dir: &Path,
    summaries: &[MaeSummary],
) -> Result<PathBuf, GenerateError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(OUTPUT_MAE_SUMMARY);
    let mut writer = csv::Writer::from_path(&path)?;

    writer.write_record(["scheme", "feature_set", "mean_mae", "sd_mae"])?;
    for summary in summaries {
        writer.write_record([
            summary.scheme.clone(),
            summary.feature_set.clone(),
            format!("{:.4}", summary.mean_mae),
            format!("{:.4}", summary.sd_mae),
        ])?;
    }

    writer.flush()?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}

/// Writes the holdout capture-rate comparison table.
///
/// # Errors
///
/// Returns [`GenerateError`] on I/O or serialization failure.
pub fn write_capture_comparison(
    dir: &Path,
    rows: &[CaptureRow],
) -> Result<PathBuf, GenerateError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(OUTPUT_CAPTURE_COMPARISON);
    let mut writer = csv::Writer::from_path(&path)?;

    writer.write_record(["method", "risk_category", "holdout_share"])?;
    for row in rows {
        writer.write_record([
            row.method.clone(),
            row.category.label().to_string(),
            format!("{:.4}", row.share),
        ])?;
    }

    writer.flush()?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}

/// Writes the residual spatial-autocorrelation table.
///
/// # Errors
///
/// Returns [`GenerateError`] on I/O or serialization failure.
pub fn write_residual_moran(
    dir: &Path,
    rows: &[ResidualMoranRow],
) -> Result<PathBuf, GenerateError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(OUTPUT_RESIDUAL_MORAN);
    let mut writer = csv::Writer::from_path(&path)?;

    writer.write_record(["scheme", "feature_set", "moran_i", "p_value"])?;
    for row in rows {
        writer.write_record([
            row.scheme.clone(),
            row.feature_set.clone(),
            format!("{:.6}", row.moran_i),
            format!("{:.4}", row.p_value),
        ])?;
    }

    writer.flush()?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskgrid_models::RiskCategory;
    use std::collections::BTreeMap;

    fn temp_dir(label: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "riskgrid_tables_{label}_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn cell_features_has_header_and_one_row_per_cell() {
        let dir = temp_dir("features");

        let mut factor_counts = BTreeMap::new();
        let mut factor_nn_distance = BTreeMap::new();
        for kind in RiskFactorKind::all() {
            factor_counts.insert(*kind, 2);
            factor_nn_distance.insert(*kind, 120.5);
        }
        let profiles = vec![CellProfile {
            cell_id: 1,
            event_count: 4,
            factor_counts,
            factor_nn_distance,
            neighborhood: Some("LOOP".to_string()),
        }];
        let signals = vec![SpatialSignal {
            cell_id: 1,
            local_i: 1.25,
            p_value: 0.001,
            significant: true,
            cluster_distance: 0.0,
        }];

        let path = write_cell_features(&dir, &profiles, &signals).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines.len(), 2, "header plus one record");
        assert!(lines[0].starts_with("cell_id,event_count"));
        assert!(lines[1].contains("LOOP"));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn capture_table_uses_ordinal_labels() {
        let dir = temp_dir("capture");
        let rows = vec![CaptureRow {
            method: "kde_1000ft".to_string(),
            category: RiskCategory::Fifth,
            share: 0.42,
        }];

        let path = write_capture_comparison(&dir, &rows).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("kde_1000ft,5th,0.4200"));

        std::fs::remove_dir_all(dir).ok();
    }
}
