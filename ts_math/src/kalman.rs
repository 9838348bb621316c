//! Exact likelihood of ARMA processes via the Kalman filter
//!
//! An ARMA(p, q) process
//!
//! ```text
//! y_t = phi_1 y_{t-1} + ... + phi_p y_{t-p} + e_t + theta_1 e_{t-1} + ... + theta_q e_{t-q}
//! ```
//!
//! is written in Harvey's state-space form with state dimension
//! `r = max(p, q + 1)`:
//!
//! ```text
//! y_t       = Z a_t,             Z = [1, 0, ..., 0]
//! a_{t+1}   = T a_t + R e_{t+1}, T = [phi | I; 0], R = [1, theta_1, ..., theta_{r-1}]'
//! ```
//!
//! The filter runs with unit innovation variance; the scale is
//! concentrated out of the Gaussian likelihood afterwards.

use crate::linalg::{solve_discrete_lyapunov, Matrix};
use crate::{MathError, Result};

/// ARMA model in state-space form
#[derive(Debug, Clone)]
pub struct ArmaStateSpace {
    dim: usize,
    transition: Matrix,
    selection: Vec<f64>,
}

/// Output of a filtering pass
#[derive(Debug, Clone)]
pub struct FilterOutput {
    /// One-step prediction errors `v_t`
    pub innovations: Vec<f64>,
    /// Prediction error variances `F_t` in units of the innovation variance
    pub variance_factors: Vec<f64>,
    /// Maximum likelihood estimate of the innovation variance
    pub sigma2: f64,
    /// Gaussian log-likelihood with `sigma2` concentrated out
    pub log_likelihood: f64,
    /// Prediction of the observation following the sample
    pub next_mean: f64,
    /// Variance factor of that prediction; multiply by `sigma2`
    pub next_variance_factor: f64,
}

impl ArmaStateSpace {
    /// Build the state-space form from AR coefficients `phi` and MA coefficients `theta`.
    pub fn new(ar: &[f64], ma: &[f64]) -> Self {
        let dim = ar.len().max(ma.len() + 1);

        let mut transition = Matrix::zeros(dim, dim);
        for (i, &phi) in ar.iter().enumerate() {
            transition.set(i, 0, phi);
        }
        for i in 0..dim - 1 {
            transition.set(i, i + 1, 1.0);
        }

        let mut selection = vec![0.0; dim];
        selection[0] = 1.0;
        for (i, &theta) in ma.iter().enumerate() {
            selection[i + 1] = theta;
        }

        Self {
            dim,
            transition,
            selection,
        }
    }

    /// State dimension `max(p, q + 1)`
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Unconditional state covariance for unit innovation variance.
    ///
    /// Only defined for stationary AR polynomials.
    pub fn stationary_covariance(&self) -> Result<Matrix> {
        let q = Matrix::outer(&self.selection);
        solve_discrete_lyapunov(&self.transition, &q)
    }

    /// Run the Kalman filter over `y`, starting from the stationary distribution.
    pub fn filter(&self, y: &[f64]) -> Result<FilterOutput> {
        if y.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot filter an empty series".to_string(),
            ));
        }

        let r = self.dim;
        let rrt = Matrix::outer(&self.selection);
        let tt = self.transition.transpose();

        let mut state = vec![0.0; r];
        let mut cov = self.stationary_covariance()?;

        let mut innovations = Vec::with_capacity(y.len());
        let mut variance_factors = Vec::with_capacity(y.len());

        for &obs in y {
            let f = cov.get(0, 0);
            if !f.is_finite() || f <= 0.0 {
                return Err(MathError::CalculationError(format!(
                    "Prediction variance became {} during filtering",
                    f
                )));
            }
            let v = obs - state[0];
            let gain = cov.column(0);

            let filtered_state: Vec<f64> = (0..r).map(|i| state[i] + gain[i] * v / f).collect();
            let mut filtered_cov = cov.clone();
            for i in 0..r {
                for j in 0..r {
                    filtered_cov.set(i, j, cov.get(i, j) - gain[i] * gain[j] / f);
                }
            }

            state = self.transition.mul_vec(&filtered_state)?;
            cov = self
                .transition
                .mul(&filtered_cov)?
                .mul(&tt)?
                .add(&rrt)?;

            innovations.push(v);
            variance_factors.push(f);
        }

        let n = y.len() as f64;
        let weighted_ss: f64 = innovations
            .iter()
            .zip(variance_factors.iter())
            .map(|(v, f)| v * v / f)
            .sum();
        let sigma2 = weighted_ss / n;
        if !sigma2.is_finite() || sigma2 <= 0.0 {
            return Err(MathError::CalculationError(format!(
                "Innovation variance estimate is {}",
                sigma2
            )));
        }

        let log_det: f64 = variance_factors.iter().map(|f| f.ln()).sum();
        let log_likelihood =
            -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + sigma2.ln() + 1.0) - 0.5 * log_det;

        Ok(FilterOutput {
            innovations,
            variance_factors,
            sigma2,
            log_likelihood,
            next_mean: state[0],
            next_variance_factor: cov.get(0, 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_state_space_layout() {
        let ss = ArmaStateSpace::new(&[0.5, -0.2], &[0.3, 0.1]);
        assert_eq!(ss.dim(), 3);
        assert_eq!(ss.transition.row(0), vec![0.5, 1.0, 0.0]);
        assert_eq!(ss.transition.row(1), vec![-0.2, 0.0, 1.0]);
        assert_eq!(ss.transition.row(2), vec![0.0, 0.0, 0.0]);
        assert_eq!(ss.selection, vec![1.0, 0.3, 0.1]);
    }

    #[test]
    fn test_white_noise_closed_form() {
        let y = [0.5, -1.0, 0.25, 2.0, -0.75];
        let out = ArmaStateSpace::new(&[], &[]).filter(&y).unwrap();

        let n = y.len() as f64;
        let sigma2 = y.iter().map(|v| v * v).sum::<f64>() / n;
        let expected = -0.5 * n * ((2.0 * PI).ln() + sigma2.ln() + 1.0);

        assert_approx_eq!(out.sigma2, sigma2, 1e-12);
        assert_approx_eq!(out.log_likelihood, expected, 1e-10);
        assert_approx_eq!(out.next_mean, 0.0);
        assert_approx_eq!(out.next_variance_factor, 1.0);
    }

    #[test]
    fn test_ar1_exact_likelihood() {
        let phi = 0.6;
        let y = [1.0, 0.4, -0.3, 0.8, 1.1, 0.2];
        let out = ArmaStateSpace::new(&[phi], &[]).filter(&y).unwrap();

        // First observation has the unconditional variance, the rest are conditional
        assert_approx_eq!(out.variance_factors[0], 1.0 / (1.0 - phi * phi), 1e-10);
        for t in 1..y.len() {
            assert_approx_eq!(out.variance_factors[t], 1.0, 1e-10);
            assert_approx_eq!(out.innovations[t], y[t] - phi * y[t - 1], 1e-10);
        }
        assert_approx_eq!(out.next_mean, phi * y[y.len() - 1], 1e-10);
    }

    #[test]
    fn test_ma1_prediction_uses_last_innovation() {
        let theta = 0.4;
        let y = [0.3, -0.2, 0.5, 0.1, -0.4, 0.6, 0.2, -0.1];
        let out = ArmaStateSpace::new(&[], &[theta]).filter(&y).unwrap();

        // Long samples converge to y_hat = theta * v_n
        let last_v = out.innovations[y.len() - 1];
        let last_f = out.variance_factors[y.len() - 1];
        assert!((out.next_mean - theta * last_v / last_f).abs() < 1e-10);
        assert!(out.next_variance_factor >= 1.0);
    }

    #[test]
    fn test_zero_series_is_rejected() {
        let result = ArmaStateSpace::new(&[0.2], &[]).filter(&[0.0, 0.0, 0.0]);
        assert!(result.is_err());
        assert!(ArmaStateSpace::new(&[], &[]).filter(&[]).is_err());
    }
}
