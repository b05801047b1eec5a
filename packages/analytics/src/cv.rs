//! Cross-validation harness for the Poisson risk model.
//!
//! Two schemes share one fit/predict/concatenate loop: a seeded random
//! k-fold partition, and leave-one-group-out with the community area as
//! the group. Each cell is predicted exactly once, always by a model
//! that never saw it.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::glm::fit_poisson;
use crate::matrix::{FeatureMatrix, FeatureSet};
use crate::AnalyticsError;

/// Cross-validation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CvScheme {
    /// Random partition into a fixed number of folds.
    RandomKFold,
    /// One fold per community area (spatial LOGO-CV).
    LeaveOneNeighborhoodOut,
}

/// Cross-validation parameters.
#[derive(Debug, Clone, Copy)]
pub struct CvConfig {
    /// Fold count for the random scheme.
    pub folds: usize,
    /// RNG seed for the random partition.
    pub seed: u64,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self { folds: 24, seed: 7 }
    }
}

/// One out-of-fold prediction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvPrediction {
    /// The predicted cell.
    pub cell_id: u32,
    /// Label of the fold this cell was held out in.
    pub fold: String,
    /// Observed count.
    pub actual: f64,
    /// Out-of-fold predicted count.
    pub predicted: f64,
}

impl CvPrediction {
    /// Signed prediction error (predicted minus actual).
    #[must_use]
    pub fn error(&self) -> f64 {
        self.predicted - self.actual
    }
}

/// The full result of one scheme x feature-set evaluation.
#[derive(Debug, Clone)]
pub struct CvOutcome {
    /// The evaluated scheme.
    pub scheme: CvScheme,
    /// The evaluated feature set.
    pub feature_set: FeatureSet,
    /// One out-of-fold prediction per cell, in cell-id order.
    pub predictions: Vec<CvPrediction>,
    /// Mean absolute error per fold, keyed by fold label.
    pub fold_mae: BTreeMap<String, f64>,
}

/// Mean and standard deviation of the per-fold MAE for one evaluation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaeSummary {
    /// The evaluated scheme.
    pub scheme: String,
    /// The evaluated feature set.
    pub feature_set: String,
    /// Mean of the per-fold MAE values.
    pub mean_mae: f64,
    /// Standard deviation of the per-fold MAE values.
    pub sd_mae: f64,
}

/// Runs cross-validation for one scheme x feature-set evaluation.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if any fold leaves too few training rows,
/// or a fold's fit fails.
pub fn cross_validate(
    matrix: &FeatureMatrix,
    scheme: CvScheme,
    feature_set: FeatureSet,
    config: &CvConfig,
) -> Result<CvOutcome, AnalyticsError> {
    let assignments = match scheme {
        CvScheme::RandomKFold => random_folds(matrix.y.len(), config),
        CvScheme::LeaveOneNeighborhoodOut => matrix.groups.clone(),
    };

    let mut fold_rows: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (row, fold) in assignments.iter().enumerate() {
        fold_rows.entry(fold.clone()).or_default().push(row);
    }

    let n = matrix.y.len();
    let p = matrix.x.ncols();
    let mut predictions: Vec<CvPrediction> = Vec::with_capacity(n);
    let mut fold_mae = BTreeMap::new();

    for (fold, holdout) in &fold_rows {
        let train_rows: Vec<usize> = (0..n).filter(|row| !holdout.contains(row)).collect();
        if train_rows.len() < p + 1 {
            return Err(AnalyticsError::InsufficientTrainingRows {
                fold: fold.clone(),
                rows: train_rows.len(),
                parameters: p,
            });
        }

        let x_train = select_rows(&matrix.x, &train_rows);
        let y_train =
            Array1::from_iter(train_rows.iter().map(|&row| matrix.y[row]));
        let fit = fit_poisson(&x_train.view(), &y_train.view())?;

        let x_test = select_rows(&matrix.x, holdout);
        let predicted = fit.predict(&x_test.view());

        let mut abs_error_sum = 0.0;
        for (position, &row) in holdout.iter().enumerate() {
            let prediction = CvPrediction {
                cell_id: matrix.cell_ids[row],
                fold: fold.clone(),
                actual: matrix.y[row],
                predicted: predicted[position],
            };
            abs_error_sum += prediction.error().abs();
            predictions.push(prediction);
        }
        #[allow(clippy::cast_precision_loss)]
        fold_mae.insert(fold.clone(), abs_error_sum / holdout.len() as f64);
    }

    predictions.sort_by_key(|p| p.cell_id);
    log::info!(
        "{scheme}: {} out-of-fold predictions across {} folds",
        predictions.len(),
        fold_mae.len()
    );

    Ok(CvOutcome {
        scheme,
        feature_set,
        predictions,
        fold_mae,
    })
}

/// Summarizes the per-fold MAE distribution of one outcome.
#[must_use]
pub fn summarize(outcome: &CvOutcome) -> MaeSummary {
    let maes: Vec<f64> = outcome.fold_mae.values().copied().collect();
    #[allow(clippy::cast_precision_loss)]
    let count = maes.len() as f64;
    let mean = maes.iter().sum::<f64>() / count;
    let variance = maes.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / count;

    MaeSummary {
        scheme: outcome.scheme.to_string(),
        feature_set: outcome.feature_set.to_string(),
        mean_mae: mean,
        sd_mae: variance.sqrt(),
    }
}

/// Assigns rows to `config.folds` random folds of near-equal size.
fn random_folds(rows: usize, config: &CvConfig) -> Vec<String> {
    let mut order: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);
    order.shuffle(&mut rng);

    let folds = config.folds.max(1);
    let mut assignments = vec![String::new(); rows];
    for (position, &row) in order.iter().enumerate() {
        assignments[row] = format!("fold-{:02}", (position % folds) + 1);
    }
    assignments
}

/// Copies the given rows of `x` into a dense matrix.
fn select_rows(x: &Array2<f64>, rows: &[usize]) -> Array2<f64> {
    let mut out = Array2::zeros((rows.len(), x.ncols()));
    for (position, &row) in rows.iter().enumerate() {
        out.row_mut(position).assign(&x.row(row));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    /// A synthetic matrix with a real signal: counts rise with the
    /// first covariate.
    fn synthetic_matrix(rows: usize, groups: usize) -> FeatureMatrix {
        let mut x = Array2::zeros((rows, 2));
        let mut y = Vec::with_capacity(rows);
        let mut group_labels = Vec::with_capacity(rows);

        for row in 0..rows {
            #[allow(clippy::cast_precision_loss)]
            let covariate = (row % 10) as f64;
            x[[row, 0]] = 1.0;
            x[[row, 1]] = covariate;
            y.push((0.2f64.mul_add(covariate, 0.1)).exp().round());
            group_labels.push(format!("area-{}", row % groups));
        }

        FeatureMatrix {
            x,
            y,
            cell_ids: (1..=u32::try_from(rows).unwrap()).collect(),
            groups: group_labels,
            column_names: vec!["intercept".to_string(), "covariate".to_string()],
        }
    }

    #[test]
    fn kfold_predicts_every_cell_exactly_once() {
        let matrix = synthetic_matrix(100, 5);
        let config = CvConfig { folds: 24, seed: 7 };
        let outcome = cross_validate(&matrix, CvScheme::RandomKFold, FeatureSet::Base, &config).unwrap();

        assert_eq!(outcome.predictions.len(), 100);
        let unique: BTreeSet<u32> =
            outcome.predictions.iter().map(|p| p.cell_id).collect();
        assert_eq!(unique.len(), 100, "no cell may be predicted twice");
        assert_eq!(outcome.fold_mae.len(), 24);
    }

    #[test]
    fn logo_uses_one_fold_per_group() {
        let matrix = synthetic_matrix(90, 6);
        let outcome = cross_validate(
            &matrix,
            CvScheme::LeaveOneNeighborhoodOut,
            FeatureSet::Base,
            &CvConfig::default(),
        )
        .unwrap();

        assert_eq!(outcome.fold_mae.len(), 6);
        assert_eq!(outcome.predictions.len(), 90);

        // Every prediction's fold is its own group.
        for prediction in &outcome.predictions {
            let row = usize::try_from(prediction.cell_id - 1).unwrap();
            assert_eq!(prediction.fold, matrix.groups[row]);
        }
    }

    #[test]
    fn predictions_are_out_of_fold() {
        // With a strong covariate signal, in-fold predictions would be
        // exact on noiseless data; out-of-fold ones still track well.
        let matrix = synthetic_matrix(80, 4);
        let outcome = cross_validate(
            &matrix,
            CvScheme::RandomKFold,
            FeatureSet::Base,
            &CvConfig { folds: 8, seed: 3 },
        )
        .unwrap();

        for prediction in &outcome.predictions {
            assert!(prediction.predicted.is_finite());
            assert!(prediction.predicted >= 0.0);
        }
    }

    #[test]
    fn seeded_partitions_are_reproducible() {
        let a = random_folds(50, &CvConfig { folds: 5, seed: 11 });
        let b = random_folds(50, &CvConfig { folds: 5, seed: 11 });
        let c = random_folds(50, &CvConfig { folds: 5, seed: 12 });

        assert_eq!(a, b);
        assert_ne!(a, c, "different seeds should shuffle differently");
    }

    #[test]
    fn summary_reports_mean_and_sd() {
        let matrix = synthetic_matrix(60, 3);
        let outcome = cross_validate(
            &matrix,
            CvScheme::RandomKFold,
            FeatureSet::Base,
            &CvConfig { folds: 6, seed: 1 },
        )
        .unwrap();
        let summary = summarize(&outcome);

        assert_eq!(summary.scheme, "random_k_fold");
        assert_eq!(summary.feature_set, "base");
        assert!(summary.mean_mae >= 0.0);
        assert!(summary.sd_mae >= 0.0);
    }

    #[test]
    fn too_small_matrix_fails_cleanly() {
        let matrix = synthetic_matrix(4, 2);
        let result = cross_validate(
            &matrix,
            CvScheme::RandomKFold,
            FeatureSet::Base,
            &CvConfig { folds: 2, seed: 1 },
        );
        assert!(matches!(
            result,
            Err(AnalyticsError::InsufficientTrainingRows { .. })
        ));
    }
}
