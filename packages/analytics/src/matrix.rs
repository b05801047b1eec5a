//! Per-cell design-matrix assembly.
//!
//! Joins the aggregation profiles with the spatial-dependence signals
//! (both keyed by cell id) into an `ndarray` design matrix. The target
//! column is carried separately and never enters the feature block.

use ndarray::Array2;
use riskgrid_models::{CellProfile, RiskFactorKind, SpatialSignal};
use strum_macros::{AsRefStr, Display};

use crate::AnalyticsError;

/// Which feature block the model is fit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum FeatureSet {
    /// Risk-factor counts and kNN distances only.
    Base,
    /// Base features plus the distance-to-significant-cluster feature.
    Spatial,
}

impl FeatureSet {
    /// Both feature sets, in evaluation order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Base, Self::Spatial]
    }
}

/// A fully joined modeling table: features, target, and fold keys.
pub struct FeatureMatrix {
    /// Design matrix, one row per cell; column 0 is the intercept.
    pub x: Array2<f64>,
    /// Target event counts, row-aligned with `x`.
    pub y: Vec<f64>,
    /// Cell id per row, ascending.
    pub cell_ids: Vec<u32>,
    /// Leave-one-group-out key per row (community area).
    pub groups: Vec<String>,
    /// Column names aligned with `x`.
    pub column_names: Vec<String>,
}

/// Fold key for cells whose centroid falls outside every community
/// area.
const UNASSIGNED_GROUP: &str = "UNASSIGNED";

/// Builds the design matrix for one feature set.
///
/// `profiles` and `signals` must cover the same cells in the same
/// order.
///
/// # Errors
///
/// Returns [`AnalyticsError::CellMismatch`] if the two tables disagree
/// on any row's cell id.
pub fn build(
    profiles: &[CellProfile],
    signals: &[SpatialSignal],
    set: FeatureSet,
) -> Result<FeatureMatrix, AnalyticsError> {
    if profiles.len() != signals.len() {
        return Err(AnalyticsError::TableLength {
            profiles: profiles.len(),
            signals: signals.len(),
        });
    }
    for (position, (profile, signal)) in profiles.iter().zip(signals).enumerate() {
        if profile.cell_id != signal.cell_id {
            return Err(AnalyticsError::CellMismatch {
                position,
                left: profile.cell_id,
                right: signal.cell_id,
            });
        }
    }

    let mut column_names = vec!["intercept".to_string()];
    for kind in RiskFactorKind::all() {
        column_names.push(format!("{}_count", kind.column_stem()));
    }
    for kind in RiskFactorKind::all() {
        column_names.push(format!("{}_nn", kind.column_stem()));
    }
    if set == FeatureSet::Spatial {
        column_names.push("cluster_distance".to_string());
    }

    let rows = profiles.len();
    let cols = column_names.len();
    let mut x = Array2::zeros((rows, cols));
    let mut y = Vec::with_capacity(rows);
    let mut cell_ids = Vec::with_capacity(rows);
    let mut groups = Vec::with_capacity(rows);

    for (row, (profile, signal)) in profiles.iter().zip(signals).enumerate() {
        let mut col = 0;
        x[[row, col]] = 1.0;
        col += 1;

        for kind in RiskFactorKind::all() {
            x[[row, col]] =
                f64::from(profile.factor_counts.get(kind).copied().unwrap_or(0));
            col += 1;
        }
        for kind in RiskFactorKind::all() {
            x[[row, col]] = profile.factor_nn_distance.get(kind).copied().unwrap_or(0.0);
            col += 1;
        }
        if set == FeatureSet::Spatial {
            x[[row, col]] = signal.cluster_distance;
        }

        y.push(f64::from(profile.event_count));
        cell_ids.push(profile.cell_id);
        groups.push(
            profile
                .neighborhood
                .clone()
                .unwrap_or_else(|| UNASSIGNED_GROUP.to_string()),
        );
    }

    Ok(FeatureMatrix {
        x,
        y,
        cell_ids,
        groups,
        column_names,
    })
}
