//! # TS Math
//!
//! Numerical building blocks for univariate time series models.
//! This crate provides the pieces an exact-likelihood ARIMA fit needs:
//! descriptive statistics and differencing, small dense linear algebra,
//! the stationarity transform, a Nelder-Mead optimizer and a Kalman
//! filter for ARMA processes in state-space form.

use thiserror::Error;

pub mod kalman;
pub mod linalg;
pub mod optimize;
pub mod stats;
pub mod transform;

pub use kalman::{ArmaStateSpace, FilterOutput};
pub use optimize::{NelderMead, OptimizeResult};

/// Errors that can occur in numerical calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numerical operations
pub type Result<T> = std::result::Result<T, MathError>;
