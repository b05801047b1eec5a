//! Out-of-sample comparison of risk surfaces.
//!
//! Classifies a continuous per-cell surface (kernel density or model
//! prediction) into the five ordinal risk categories with natural
//! breaks, then reports the share of held-out-year events captured by
//! each category. Well-calibrated surfaces put most holdout events in
//! the upper categories.

use std::collections::BTreeMap;

use riskgrid_models::RiskCategory;
use riskgrid_stats::breaks::NaturalBreaks;
use riskgrid_stats::moran::global_moran;
use riskgrid_stats::weights::SpatialWeights;
use serde::Serialize;

use crate::cv::CvOutcome;
use crate::AnalyticsError;

/// Share of holdout events captured by one risk category of one method.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRow {
    /// Surface label (e.g. `"kde_1000ft"`, `"model_spatial"`).
    pub method: String,
    /// Risk category.
    pub category: RiskCategory,
    /// Fraction of holdout events falling in cells of this category.
    pub share: f64,
}

/// Residual spatial autocorrelation of one cross-validated model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidualMoranRow {
    /// The evaluated scheme.
    pub scheme: String,
    /// The evaluated feature set.
    pub feature_set: String,
    /// Global Moran's I of the out-of-fold errors.
    pub moran_i: f64,
    /// Permutation pseudo p-value.
    pub p_value: f64,
}

/// Assigns each cell a risk category from a continuous surface.
///
/// # Errors
///
/// Returns [`AnalyticsError::Stats`] if the surface cannot be split
/// into five classes.
pub fn categorize(surface: &[f64]) -> Result<Vec<RiskCategory>, AnalyticsError> {
    let breaks = NaturalBreaks::fit(surface, RiskCategory::all().len())?;
    Ok(breaks
        .classify(surface)
        .into_iter()
        .map(|class| {
            let rank = u8::try_from(class + 1).unwrap_or(1);
            RiskCategory::from_value(rank).unwrap_or(RiskCategory::First)
        })
        .collect())
}

/// Computes the holdout capture share per risk category for one surface.
///
/// `surface` and `holdout_counts` are row-aligned per-cell tables.
///
/// # Errors
///
/// Returns [`AnalyticsError::EmptyHoldout`] when the holdout year has
/// no events, and propagates classification errors.
pub fn capture_rates(
    method: &str,
    surface: &[f64],
    holdout_counts: &[u32],
) -> Result<Vec<CaptureRow>, AnalyticsError> {
    let total: u64 = holdout_counts.iter().map(|&c| u64::from(c)).sum();
    if total == 0 {
        return Err(AnalyticsError::EmptyHoldout);
    }

    let categories = categorize(surface)?;
    let mut captured: BTreeMap<RiskCategory, u64> = RiskCategory::all()
        .iter()
        .map(|&category| (category, 0))
        .collect();
    for (category, &count) in categories.iter().zip(holdout_counts) {
        *captured.entry(*category).or_default() += u64::from(count);
    }

    #[allow(clippy::cast_precision_loss)]
    let rows = RiskCategory::all()
        .iter()
        .map(|&category| CaptureRow {
            method: method.to_string(),
            category,
            share: captured[&category] as f64 / total as f64,
        })
        .collect();
    Ok(rows)
}

/// Global Moran's I of one outcome's out-of-fold errors.
///
/// Predictions are re-aligned to cell-id order (the weight matrix's
/// order) before the statistic is computed.
///
/// # Errors
///
/// Propagates [`AnalyticsError::Stats`] from the Moran computation.
pub fn residual_autocorrelation(
    outcome: &CvOutcome,
    weights: &SpatialWeights,
    permutations: usize,
    seed: u64,
) -> Result<ResidualMoranRow, AnalyticsError> {
    let errors: Vec<f64> = outcome
        .predictions
        .iter()
        .map(crate::cv::CvPrediction::error)
        .collect();
    let result = global_moran(&errors, weights, permutations, seed)?;

    Ok(ResidualMoranRow {
        scheme: outcome.scheme.to_string(),
        feature_set: outcome.feature_set.to_string(),
        moran_i: result.i,
        p_value: result.p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_shares_sum_to_one() {
        let surface = vec![0.1, 0.5, 2.0, 5.0, 9.0, 0.2, 4.0, 7.0, 1.0, 3.0];
        let holdout = vec![1, 0, 2, 3, 10, 0, 2, 5, 1, 1];

        let rows = capture_rates("kde_1000ft", &surface, &holdout).unwrap();
        assert_eq!(rows.len(), 5);
        let total: f64 = rows.iter().map(|r| r.share).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn concentrated_surface_captures_events_in_top_category() {
        // One cell dominates the surface and holds all holdout events.
        let surface = vec![0.0, 0.1, 0.05, 0.2, 100.0];
        let holdout = vec![0, 0, 0, 0, 25];

        let rows = capture_rates("model_base", &surface, &holdout).unwrap();
        let top = rows
            .iter()
            .find(|r| r.category == RiskCategory::Fifth)
            .unwrap();
        assert!((top.share - 1.0).abs() < 1e-12);
    }

    #[test]
    fn categorization_is_monotonic_in_the_surface() {
        let surface = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let categories = categorize(&surface).unwrap();

        for pair in categories.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn empty_holdout_is_rejected() {
        let surface = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let holdout = vec![0, 0, 0, 0, 0];
        assert!(matches!(
            capture_rates("kde", &surface, &holdout),
            Err(AnalyticsError::EmptyHoldout)
        ));
    }
}
