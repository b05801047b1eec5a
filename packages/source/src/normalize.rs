//! Normalizes raw Socrata records into [`NormalizedPoint`] values.
//!
//! Socrata delivers every column as a string (or occasionally a bare
//! number), so coordinate and timestamp parsing is defensive. Rows with
//! missing or unparseable coordinates are dropped, exact duplicates are
//! collapsed, and an optional year filter re-checks the server-side
//! `$where` restriction.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use riskgrid_models::NormalizedPoint;

use crate::source_def::SourceDefinition;
use crate::SourceError;

/// Loads a raw fetch file and normalizes its records.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read, or if
/// normalization drops every record.
pub fn load_points(
    path: &Path,
    source: &SourceDefinition,
    year: Option<i32>,
) -> Result<Vec<NormalizedPoint>, SourceError> {
    let body = std::fs::read_to_string(path)?;
    let records: Vec<serde_json::Value> = serde_json::from_str(&body)?;
    let points = normalize_records(&records, source, year);

    if points.is_empty() {
        return Err(SourceError::EmptyResult {
            source_id: source.id.clone(),
        });
    }
    Ok(points)
}

/// Normalizes raw records, dropping incomplete rows and duplicates.
#[must_use]
pub fn normalize_records(
    records: &[serde_json::Value],
    source: &SourceDefinition,
    year: Option<i32>,
) -> Vec<NormalizedPoint> {
    let mut seen: BTreeSet<(i64, u64, u64)> = BTreeSet::new();
    let mut dropped_coords = 0usize;
    let mut dropped_dates = 0usize;
    let mut duplicates = 0usize;

    let mut points = Vec::with_capacity(records.len());

    for record in records {
        let Some(latitude) = field_as_f64(record, &source.latitude_column) else {
            dropped_coords += 1;
            continue;
        };
        let Some(longitude) = field_as_f64(record, &source.longitude_column) else {
            dropped_coords += 1;
            continue;
        };
        let occurred_at = match record
            .get(&source.date_column)
            .and_then(serde_json::Value::as_str)
            .and_then(parse_socrata_date)
        {
            Some(dt) => dt,
            None => {
                dropped_dates += 1;
                continue;
            }
        };

        if let Some(year) = year
            && occurred_at.year() != year
        {
            continue;
        }

        // Identical place + identical time is a duplicate row, a known
        // artifact of portal re-publishes.
        let key = (
            occurred_at.and_utc().timestamp(),
            latitude.to_bits(),
            longitude.to_bits(),
        );
        if !seen.insert(key) {
            duplicates += 1;
            continue;
        }

        points.push(NormalizedPoint {
            longitude,
            latitude,
            occurred_at,
        });
    }

    log::info!(
        "Normalized {} {} points ({dropped_coords} missing coords, \
         {dropped_dates} bad dates, {duplicates} duplicates dropped)",
        points.len(),
        source.id
    );
    points
}

/// Reads a field that may be a JSON string or a JSON number.
fn field_as_f64(record: &serde_json::Value, column: &str) -> Option<f64> {
    let value = record.get(column)?;
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parses the timestamp formats Socrata datasets use: ISO 8601 with or
/// without fractional seconds, and date-only values.
#[must_use]
pub fn parse_socrata_date(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
