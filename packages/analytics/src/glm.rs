//! Log-link Poisson regression via iteratively reweighted least squares.
//!
//! The IRLS loop solves the weighted normal equations with a dense
//! Cholesky factorization; the design matrices here are a handful of
//! columns, so no external factorization backend is warranted.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::AnalyticsError;

/// Cap on the linear predictor to keep `exp` finite during iteration.
const ETA_CLAMP: f64 = 30.0;

/// Floor for IRLS working weights.
const WEIGHT_FLOOR: f64 = 1e-10;

/// Relative deviance change below which the fit is converged.
const TOLERANCE: f64 = 1e-8;

/// Iteration cap; Poisson IRLS on well-posed data converges in under
/// ten.
const MAX_ITERATIONS: usize = 50;

/// A fitted Poisson regression.
#[derive(Debug, Clone)]
pub struct PoissonFit {
    /// Coefficients aligned with the design-matrix columns.
    pub coefficients: Array1<f64>,
    /// Final model deviance.
    pub deviance: f64,
    /// IRLS iterations used.
    pub iterations: usize,
}

impl PoissonFit {
    /// Predicted mean counts for a design matrix.
    #[must_use]
    pub fn predict(&self, x: &ArrayView2<'_, f64>) -> Array1<f64> {
        x.dot(&self.coefficients)
            .mapv(|eta| eta.clamp(-ETA_CLAMP, ETA_CLAMP).exp())
    }
}

/// Fits a log-link Poisson regression of `y` on `x`.
///
/// # Errors
///
/// Returns [`AnalyticsError::DegenerateTarget`] when `y` sums to zero
/// and [`AnalyticsError::SingularSystem`] when the weighted
/// least-squares system cannot be factorized (collinear columns).
pub fn fit_poisson(
    x: &ArrayView2<'_, f64>,
    y: &ArrayView1<'_, f64>,
) -> Result<PoissonFit, AnalyticsError> {
    let n = x.nrows();
    let p = x.ncols();

    #[allow(clippy::cast_precision_loss)]
    let mean_y = y.sum() / n as f64;
    if mean_y <= 0.0 {
        return Err(AnalyticsError::DegenerateTarget);
    }

    // Start from the intercept-only solution.
    let mut beta = Array1::zeros(p);
    beta[0] = mean_y.ln();

    let mut deviance = f64::INFINITY;
    let mut iterations = 0;

    for iteration in 1..=MAX_ITERATIONS {
        iterations = iteration;

        let eta = x.dot(&beta).mapv(|e| e.clamp(-ETA_CLAMP, ETA_CLAMP));
        let mu = eta.mapv(f64::exp);

        // Working response and weights for the log link.
        let weights = mu.mapv(|m| m.max(WEIGHT_FLOOR));
        let z = &eta + &((y - &mu) / &weights);

        // Normal equations X' W X beta = X' W z.
        let mut xtwx = Array2::zeros((p, p));
        let mut xtwz = Array1::zeros(p);
        for row in 0..n {
            let w = weights[row];
            let xr = x.row(row);
            for a in 0..p {
                let wxa = w * xr[a];
                xtwz[a] += wxa * z[row];
                for b in a..p {
                    xtwx[[a, b]] += wxa * xr[b];
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                xtwx[[a, b]] = xtwx[[b, a]];
            }
        }

        beta = cholesky_solve(&xtwx, &xtwz).ok_or(AnalyticsError::SingularSystem)?;

        let new_deviance = poisson_deviance(y, &mu);
        let change = (deviance - new_deviance).abs() / (new_deviance.abs() + 0.1);
        deviance = new_deviance;
        if change < TOLERANCE {
            break;
        }
    }

    log::debug!("Poisson IRLS converged in {iterations} iterations, deviance {deviance:.4}");
    Ok(PoissonFit {
        coefficients: beta,
        deviance,
        iterations,
    })
}

/// Poisson deviance: `2 * sum(y ln(y / mu) - (y - mu))`, with the
/// `y = 0` terms contributing only `mu`.
fn poisson_deviance(y: &ArrayView1<'_, f64>, mu: &Array1<f64>) -> f64 {
    y.iter()
        .zip(mu)
        .map(|(&yi, &mui)| {
            let term = if yi > 0.0 { yi * (yi / mui).ln() } else { 0.0 };
            2.0 * (term - (yi - mui))
        })
        .sum()
}

/// Solves `A x = b` for symmetric positive-definite `A` via Cholesky.
///
/// Returns `None` when `A` is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let p = a.nrows();
    let mut l = Array2::<f64>::zeros((p, p));

    for j in 0..p {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if diag <= 1e-12 || !diag.is_finite() {
            return None;
        }
        l[[j, j]] = diag.sqrt();

        for i in (j + 1)..p {
            let mut value = a[[i, j]];
            for k in 0..j {
                value -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = value / l[[j, j]];
        }
    }

    // Forward substitution: L w = b.
    let mut w = Array1::<f64>::zeros(p);
    for i in 0..p {
        let mut value = b[i];
        for k in 0..i {
            value -= l[[i, k]] * w[k];
        }
        w[i] = value / l[[i, i]];
    }

    // Back substitution: L' x = w.
    let mut x = Array1::<f64>::zeros(p);
    for i in (0..p).rev() {
        let mut value = w[i];
        for k in (i + 1)..p {
            value -= l[[k, i]] * x[k];
        }
        x[i] = value / l[[i, i]];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn intercept_only_fit_recovers_log_mean() {
        let x = Array2::from_shape_vec((4, 1), vec![1.0; 4]).unwrap();
        let y = array![1.0, 2.0, 3.0, 2.0];

        let fit = fit_poisson(&x.view(), &y.view()).unwrap();
        assert!((fit.coefficients[0] - 2.0f64.ln()).abs() < 1e-6);

        let mu = fit.predict(&x.view());
        assert!(mu.iter().all(|&m| (m - 2.0).abs() < 1e-6));
    }

    #[test]
    fn recovers_known_coefficients_on_noiseless_data() {
        let beta0: f64 = 0.4;
        let beta1: f64 = 0.25;
        let n = 60;

        let mut rows = Vec::with_capacity(n * 2);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            #[allow(clippy::cast_precision_loss)]
            let covariate = (i as f64) / 10.0;
            rows.push(1.0);
            rows.push(covariate);
            y.push((beta1.mul_add(covariate, beta0)).exp());
        }
        let x = Array2::from_shape_vec((n, 2), rows).unwrap();
        let y = Array1::from_vec(y);

        let fit = fit_poisson(&x.view(), &y.view()).unwrap();
        assert!(
            (fit.coefficients[0] - beta0).abs() < 1e-5,
            "intercept {}",
            fit.coefficients[0]
        );
        assert!(
            (fit.coefficients[1] - beta1).abs() < 1e-5,
            "slope {}",
            fit.coefficients[1]
        );
    }

    #[test]
    fn predictions_are_non_negative() {
        let x = Array2::from_shape_vec((3, 2), vec![1.0, -5.0, 1.0, 0.0, 1.0, 5.0]).unwrap();
        let y = array![0.0, 1.0, 4.0];

        let fit = fit_poisson(&x.view(), &y.view()).unwrap();
        let mu = fit.predict(&x.view());
        assert!(mu.iter().all(|&m| m >= 0.0));
    }

    #[test]
    fn all_zero_target_is_degenerate() {
        let x = Array2::from_shape_vec((3, 1), vec![1.0; 3]).unwrap();
        let y = array![0.0, 0.0, 0.0];
        assert!(matches!(
            fit_poisson(&x.view(), &y.view()),
            Err(AnalyticsError::DegenerateTarget)
        ));
    }

    #[test]
    fn collinear_columns_are_singular() {
        // Second column duplicates the intercept.
        let x = Array2::from_shape_vec((4, 2), vec![1.0; 8]).unwrap();
        let y = array![1.0, 2.0, 3.0, 4.0];
        assert!(matches!(
            fit_poisson(&x.view(), &y.view()),
            Err(AnalyticsError::SingularSystem)
        ));
    }

    #[test]
    fn cholesky_solves_a_known_system() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![10.0, 8.0];
        let x = cholesky_solve(&a, &b).unwrap();

        // Verify A x = b.
        let back = a.dot(&x);
        assert!((back[0] - 10.0).abs() < 1e-10);
        assert!((back[1] - 8.0).abs() < 1e-10);
    }
}
