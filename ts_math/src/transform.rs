//! Reparameterizations keeping lag polynomials stationary
//!
//! Unconstrained reals are mapped to partial autocorrelations in (-1, 1)
//! and then through the Durbin-Levinson recursion to AR coefficients. The
//! image is exactly the set of stationary AR polynomials, which lets an
//! unconstrained optimizer search over stationary (and, with a sign flip,
//! invertible MA) models only.

use crate::{MathError, Result};

/// Map unconstrained values to the coefficients `phi` of a stationary
/// polynomial `1 - phi_1 L - ... - phi_n L^n`.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let n = unconstrained.len();
    if n == 0 {
        return Vec::new();
    }

    let pacf: Vec<f64> = unconstrained
        .iter()
        .map(|x| x / (1.0 + x * x).sqrt())
        .collect();

    let mut y = vec![vec![0.0; n]; n];
    for k in 0..n {
        for i in 0..k {
            y[k][i] = y[k - 1][i] + pacf[k] * y[k - 1][k - i - 1];
        }
        y[k][k] = pacf[k];
    }

    y[n - 1].iter().map(|v| -v).collect()
}

/// Inverse of [`constrain_stationary`].
///
/// Fails when `constrained` is not a stationary polynomial.
pub fn unconstrain_stationary(constrained: &[f64]) -> Result<Vec<f64>> {
    let n = constrained.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut y = vec![vec![0.0; n]; n];
    y[n - 1] = constrained.iter().map(|v| -v).collect();

    for k in (1..n).rev() {
        let reflection = y[k][k];
        let denom = 1.0 - reflection * reflection;
        if denom <= 0.0 {
            return Err(MathError::InvalidInput(
                "Coefficients do not describe a stationary polynomial".to_string(),
            ));
        }
        for i in 0..k {
            y[k - 1][i] = (y[k][i] - reflection * y[k][k - i - 1]) / denom;
        }
    }

    (0..n)
        .map(|k| {
            let r = y[k][k];
            if r.abs() >= 1.0 || !r.is_finite() {
                Err(MathError::InvalidInput(
                    "Coefficients do not describe a stationary polynomial".to_string(),
                ))
            } else {
                Ok(r / (1.0 - r * r).sqrt())
            }
        })
        .collect()
}

/// Whether `1 - phi_1 L - ... - phi_n L^n` has all roots outside the unit circle.
pub fn is_stationary(phi: &[f64]) -> bool {
    unconstrain_stationary(phi).is_ok()
}

/// Whether `1 + theta_1 L + ... + theta_n L^n` has all roots outside the unit circle.
pub fn is_invertible(theta: &[f64]) -> bool {
    let negated: Vec<f64> = theta.iter().map(|t| -t).collect();
    is_stationary(&negated)
}
