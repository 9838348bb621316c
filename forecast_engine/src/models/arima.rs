//! ARIMA models fitted by exact maximum likelihood
//!
//! The series is differenced `d` times inside the model. The ARMA(p, q)
//! part of the differenced series is evaluated through its state-space
//! form and a Kalman filter, giving the exact Gaussian likelihood with the
//! innovation variance concentrated out. Coefficients are searched in an
//! unconstrained space mapped onto stationary AR and invertible MA
//! polynomials, starting from Hannan-Rissanen estimates. Forecasts are
//! integrated back to the level of the input series.
//!
//! With `d > 0` the model carries no constant. With `d = 0` the sample
//! mean is removed before fitting and added back to the forecast.

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ModelOrder, PointForecast, TrainedForecastModel};
use tracing::{debug, warn};
use ts_math::kalman::{ArmaStateSpace, FilterOutput};
use ts_math::linalg::{least_squares, Matrix};
use ts_math::optimize::NelderMead;
use ts_math::stats::{autocovariance, difference, levinson_durbin};
use ts_math::transform::{
    constrain_stationary, is_invertible, is_stationary, unconstrain_stationary,
};

/// Largest magnitude an unconstrained coefficient may take.
///
/// Beyond it the objective is flat, so the simplex settles instead of
/// drifting towards the unit circle.
const PARAM_BOUND: f64 = 30.0;

/// Initial simplex edge in unconstrained parameter space
const SIMPLEX_STEP: f64 = 0.25;

/// Differenced values below this magnitude are treated as exact zeros
const DEGENERATE_TOLERANCE: f64 = 1e-12;

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// Model order
    order: ModelOrder,
    /// Optimizer used for the likelihood search
    optimizer: NelderMead,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    /// Name of the model
    name: String,
    /// Model order
    order: ModelOrder,
    /// Fitted AR coefficients
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients
    ma_coefficients: Vec<f64>,
    /// Innovation variance
    sigma2: f64,
    /// Maximized log-likelihood, `None` for a degenerate (zero variance) fit
    log_likelihood: Option<f64>,
    /// Mean removed before fitting (`d = 0` only)
    mean: f64,
    /// Last `d` levels of the input, most recent last
    tail: Vec<f64>,
    /// Prediction of the next differenced value
    next_difference: f64,
    /// Variance factor of that prediction
    next_variance_factor: f64,
    /// Number of observations in the input series
    nobs: usize,
    /// Simplex iterations used
    iterations: usize,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        if p > 10 || q > 10 {
            return Err(ForecastError::InvalidParameter(format!(
                "AR and MA orders must be <= 10, got p={}, q={}",
                p, q
            )));
        }
        if d > 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "Differencing order must be <= 2, got {}",
                d
            )));
        }

        let order = ModelOrder::new(p, d, q);
        Ok(Self {
            name: order.to_string(),
            order,
            optimizer: NelderMead::new()
                .with_max_iterations(4000 * (p + q).max(1))
                .with_tolerances(1e-10, 1e-8)
                .with_initial_step(SIMPLEX_STEP),
        })
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    /// Smallest input length the model accepts
    pub fn min_observations(&self) -> usize {
        self.order.p + self.order.d + self.order.q + 1
    }

    /// Split unconstrained parameters into stationary AR and invertible MA coefficients
    fn constrain(&self, params: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let bounded: Vec<f64> = params
            .iter()
            .map(|x| x.clamp(-PARAM_BOUND, PARAM_BOUND))
            .collect();
        let ar = constrain_stationary(&bounded[..self.order.p]);
        let ma = constrain_stationary(&bounded[self.order.p..])
            .into_iter()
            .map(|v| -v)
            .collect();
        (ar, ma)
    }

    fn unconstrain(&self, ar: &[f64], ma: &[f64]) -> Option<Vec<f64>> {
        let negated_ma: Vec<f64> = ma.iter().map(|v| -v).collect();
        let mut params = unconstrain_stationary(ar).ok()?;
        params.extend(unconstrain_stationary(&negated_ma).ok()?);
        params
            .iter()
            .all(|v| v.is_finite() && v.abs() < PARAM_BOUND)
            .then_some(params)
    }

    /// Hannan-Rissanen estimates: a long autoregression supplies innovation
    /// proxies, then the series is regressed on its own lags and lagged proxies.
    fn hannan_rissanen(&self, w: &[f64]) -> Option<(Vec<f64>, Vec<f64>)> {
        let (p, q) = (self.order.p, self.order.q);
        let m = w.len();
        let long_order = ((m as f64).ln().powf(1.5).ceil() as usize).max(p + q);
        if long_order == 0 || m <= 2 * long_order + p + q + 10 {
            return None;
        }

        let acov = autocovariance(w, long_order).ok()?;
        let (long_ar, _) = levinson_durbin(&acov, long_order).ok()?;

        // residuals[t - long_order] approximates e_t
        let residuals: Vec<f64> = (long_order..m)
            .map(|t| w[t] - (0..long_order).map(|j| long_ar[j] * w[t - 1 - j]).sum::<f64>())
            .collect();

        let start = (long_order + q).max(p);
        let rows: Vec<Vec<f64>> = (start..m)
            .map(|t| {
                let mut row: Vec<f64> = (1..=p).map(|j| w[t - j]).collect();
                row.extend((1..=q).map(|j| residuals[t - j - long_order]));
                row
            })
            .collect();
        let response: Vec<f64> = w[start..].to_vec();

        let design = Matrix::from_rows(&rows).ok()?;
        let beta = least_squares(&design, &response).ok()?;
        Some((beta[..p].to_vec(), beta[p..].to_vec()))
    }

    fn starting_params(&self, w: &[f64]) -> Vec<f64> {
        let zeros = vec![0.0; self.order.n_params()];
        let Some((ar, ma)) = self.hannan_rissanen(w) else {
            return zeros;
        };
        if !is_stationary(&ar) || !is_invertible(&ma) {
            debug!(?ar, ?ma, "Hannan-Rissanen start not stationary/invertible, starting from zero");
            return zeros;
        }
        match self.unconstrain(&ar, &ma) {
            Some(params) => {
                debug!(?ar, ?ma, "Hannan-Rissanen starting values");
                params
            }
            None => {
                debug!(?ar, ?ma, "Hannan-Rissanen start too close to the unit circle, starting from zero");
                zeros
            }
        }
    }

    fn filter(&self, params: &[f64], w: &[f64]) -> ts_math::Result<FilterOutput> {
        let (ar, ma) = self.constrain(params);
        ArmaStateSpace::new(&ar, &ma).filter(w)
    }

    /// Maximize the concentrated likelihood of the differenced series
    fn estimate(&self, w: &[f64]) -> Result<(Vec<f64>, FilterOutput, usize)> {
        let n = w.len() as f64;
        let objective = |params: &[f64]| match self.filter(params, w) {
            Ok(out) => -out.log_likelihood / n,
            Err(_) => f64::INFINITY,
        };

        if self.order.n_params() == 0 {
            let out = self
                .filter(&[], w)
                .map_err(|e| ForecastError::ForecastingError(e.to_string()))?;
            return Ok((Vec::new(), out, 0));
        }

        let start = self.starting_params(w);
        let mut result = self
            .optimizer
            .minimize(objective, &start)
            .map_err(|e| ForecastError::ForecastingError(format!("Likelihood search failed: {}", e)))?;
        let mut iterations = result.iterations;

        if !result.converged {
            // One restart from the best vertex rebuilds a degenerate simplex
            warn!(
                iterations = result.iterations,
                "{} likelihood search hit the iteration limit, restarting", self.name
            );
            result = self
                .optimizer
                .minimize(objective, &result.x)
                .map_err(|e| {
                    ForecastError::ForecastingError(format!("Likelihood search failed: {}", e))
                })?;
            iterations += result.iterations;
        }

        if !result.converged {
            return Err(ForecastError::ForecastingError(format!(
                "{} likelihood search did not converge after {} iterations",
                self.name, iterations
            )));
        }

        let out = self
            .filter(&result.x, w)
            .map_err(|e| ForecastError::ForecastingError(e.to_string()))?;
        if !out.log_likelihood.is_finite() || !out.next_mean.is_finite() {
            return Err(ForecastError::ForecastingError(format!(
                "{} produced a non-finite fit",
                self.name
            )));
        }

        Ok((result.x, out, iterations))
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, data: &TimeSeriesData) -> Result<TrainedArimaModel> {
        let levels = data.values();
        let required = self.min_observations();
        if levels.len() < required {
            return Err(ForecastError::ForecastingError(format!(
                "Insufficient data for {}. Need at least {} observations, got {}.",
                self.name,
                required,
                levels.len()
            )));
        }

        let (mean, centered) = if self.order.d == 0 {
            let mean = ts_math::stats::mean(&levels)?;
            (mean, levels.iter().map(|v| v - mean).collect())
        } else {
            (0.0, levels.clone())
        };
        let w = difference(&centered, self.order.d);
        let tail = levels[levels.len() - self.order.d..].to_vec();

        if w.iter().all(|v| v.abs() < DEGENERATE_TOLERANCE) {
            debug!("{}: differenced series is identically zero", self.name);
            return Ok(TrainedArimaModel {
                name: self.name.clone(),
                order: self.order,
                ar_coefficients: vec![0.0; self.order.p],
                ma_coefficients: vec![0.0; self.order.q],
                sigma2: 0.0,
                log_likelihood: None,
                mean,
                tail,
                next_difference: 0.0,
                next_variance_factor: 1.0,
                nobs: levels.len(),
                iterations: 0,
            });
        }

        let (params, out, iterations) = self.estimate(&w)?;
        let (ar, ma) = self.constrain(&params);
        debug!(
            ?ar,
            ?ma,
            sigma2 = out.sigma2,
            loglike = out.log_likelihood,
            iterations,
            "{} fitted on {} observations",
            self.name,
            levels.len()
        );

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            order: self.order,
            ar_coefficients: ar,
            ma_coefficients: ma,
            sigma2: out.sigma2,
            log_likelihood: Some(out.log_likelihood),
            mean,
            tail,
            next_difference: out.next_mean,
            next_variance_factor: out.next_variance_factor,
            nobs: levels.len(),
            iterations,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    pub fn order(&self) -> ModelOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> Option<f64> {
        self.log_likelihood
    }

    pub fn nobs(&self) -> usize {
        self.nobs
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Undo `d` rounds of differencing for a one-step value.
    ///
    /// x_{n+1} = w_{n+1} - sum_{k=1..d} C(d, k) (-1)^k x_{n+1-k}
    fn integrate(&self, next_difference: f64) -> f64 {
        let d = self.order.d;
        let mut level = next_difference;
        let mut binom = 1.0;
        for k in 1..=d {
            binom = binom * (d + 1 - k) as f64 / k as f64;
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            level -= binom * sign * self.tail[d - k];
        }
        level + self.mean
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast_one_step(&self) -> Result<PointForecast> {
        let mean = self.integrate(self.next_difference);
        let std_error = (self.sigma2 * self.next_variance_factor).sqrt();
        if !mean.is_finite() || !std_error.is_finite() {
            return Err(ForecastError::ForecastingError(format!(
                "{} forecast is not finite",
                self.name
            )));
        }
        Ok(PointForecast::new(mean, std_error))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
