//! Forecasting models for time series data

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt::{self, Debug};

/// Order (p, d, q) of an ARIMA model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOrder {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl ModelOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Number of estimated ARMA coefficients
    pub fn n_params(&self) -> usize {
        self.p + self.q
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// One-step-ahead forecast in the level of the original series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointForecast {
    /// Forecast mean
    pub mean: f64,
    /// Standard error of the forecast
    pub std_error: f64,
}

impl PointForecast {
    pub fn new(mean: f64, std_error: f64) -> Self {
        Self { mean, std_error }
    }

    /// Two-sided normal prediction interval at `confidence_level`
    pub fn interval(&self, confidence_level: f64) -> Result<(f64, f64)> {
        if confidence_level <= 0.0 || confidence_level >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Confidence level must be between 0 and 1".to_string(),
            ));
        }

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::ForecastingError(e.to_string()))?;
        let z = normal.inverse_cdf(0.5 + confidence_level / 2.0);
        let margin = z * self.std_error;

        Ok((self.mean - margin, self.mean + margin))
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Forecast the observation following the training sample
    fn forecast_one_step(&self) -> Result<PointForecast>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on time series data
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on time series data
    fn train(&self, data: &TimeSeriesData) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod arima;
