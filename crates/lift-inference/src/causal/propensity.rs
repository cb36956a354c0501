//! Ridge-penalised logistic propensity model, fitted by IRLS.
//!
//! Covariates are standardised before fitting so the penalty treats every
//! covariate alike; the intercept is not penalised. The penalty keeps the
//! fit finite under (quasi-)complete separation, which is common when a
//! covariate nearly determines treatment.

use lift_core::{Error, Result};
use nalgebra::{DMatrix, DVector};

const MAX_ITER: usize = 100;
const TOL: f64 = 1e-8;

#[inline]
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Fit `P(treated = 1 | covariates)` and return in-sample probabilities.
///
/// `covariates` is column-major: `covariates[j][i]` is covariate `j` of row `i`.
/// With no covariates the model reduces to the treated share.
pub(crate) fn fit_propensity(treated: &[bool], covariates: &[Vec<f64>], ridge: f64) -> Result<Vec<f64>> {
    let n = treated.len();
    if n == 0 {
        return Err(Error::InvalidArgument("propensity model needs at least one row".into()));
    }
    if covariates.iter().any(|c| c.len() != n) {
        return Err(Error::InvalidArgument("covariate columns must match treatment length".into()));
    }
    if !(ridge.is_finite() && ridge >= 0.0) {
        return Err(Error::InvalidArgument(format!("ridge penalty must be >= 0, got {ridge}")));
    }

    // Standardised design with a leading intercept column, row-major.
    let p = covariates.len();
    let d = p + 1;
    let mut x = vec![0.0_f64; n * d];
    for i in 0..n {
        x[i * d] = 1.0;
    }
    for (j, col) in covariates.iter().enumerate() {
        let mean = col.iter().sum::<f64>() / n as f64;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let scale = if var > 1e-24 { var.sqrt() } else { 0.0 };
        for i in 0..n {
            x[i * d + 1 + j] = if scale > 0.0 { (col[i] - mean) / scale } else { 0.0 };
        }
    }
    let y: Vec<f64> = treated.iter().map(|&t| if t { 1.0 } else { 0.0 }).collect();

    let mut beta = vec![0.0_f64; d];
    let mut converged = false;
    for iter in 0..MAX_ITER {
        let mut grad = vec![0.0_f64; d];
        let mut hess = vec![0.0_f64; d * d];
        for i in 0..n {
            let row = &x[i * d..(i + 1) * d];
            let eta: f64 = row.iter().zip(&beta).map(|(a, b)| a * b).sum();
            let mu = sigmoid(eta);
            let w = (mu * (1.0 - mu)).max(1e-12);
            let r = mu - y[i];
            for a in 0..d {
                grad[a] += row[a] * r;
                for b in a..d {
                    hess[a * d + b] += w * row[a] * row[b];
                }
            }
        }
        for a in 0..d {
            for b in 0..a {
                hess[a * d + b] = hess[b * d + a];
            }
        }
        for a in 1..d {
            grad[a] += ridge * beta[a];
            hess[a * d + a] += ridge;
        }

        let h = DMatrix::from_row_slice(d, d, &hess);
        let g = DVector::from_vec(grad);
        let step = match h.clone().cholesky() {
            Some(chol) => chol.solve(&g),
            None => h.lu().solve(&g).ok_or_else(|| {
                Error::Computation("propensity model Hessian is singular".into())
            })?,
        };

        let mut max_step = 0.0_f64;
        for a in 0..d {
            beta[a] -= step[a];
            max_step = max_step.max(step[a].abs());
        }
        if !max_step.is_finite() {
            return Err(Error::Computation("propensity model diverged".into()));
        }
        if max_step < TOL {
            tracing::debug!(iterations = iter + 1, "propensity model converged");
            converged = true;
            break;
        }
    }
    if !converged {
        tracing::warn!(max_iter = MAX_ITER, "propensity model did not converge; using last iterate");
    }

    Ok((0..n)
        .map(|i| {
            let row = &x[i * d..(i + 1) * d];
            sigmoid(row.iter().zip(&beta).map(|(a, b)| a * b).sum())
        })
        .collect())
}
