//! Error types for the forecast_engine crate

use thiserror::Error;

/// Custom error types for the forecast_engine crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A required setting or credential is missing
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The series source failed or returned an unusable series
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    /// Model fitting or forecasting failed
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from numerical routines
    #[error("Math error: {0}")]
    MathError(#[from] ts_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl ForecastError {
    /// Whether this error originates from the series source
    pub fn is_upstream(&self) -> bool {
        matches!(self, ForecastError::UpstreamError(_))
    }
}
