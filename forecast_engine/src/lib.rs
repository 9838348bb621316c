//! # Forecast Engine
//!
//! Fetches a monthly macroeconomic series and forecasts its next value.
//!
//! ## Features
//!
//! - Monthly series handling with calendar-correct period labels
//! - Series sources: the FRED observations API and FRED-style CSV files
//! - ARIMA models fitted by exact maximum likelihood (Kalman filter)
//! - A fixed ARIMA(2,1,2) one-step-ahead forecast
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forecast_engine::source::FredClient;
//! use forecast_engine::ForecastEngine;
//!
//! let engine = ForecastEngine::new(FredClient::new(std::env::var("FRED_API_KEY").ok()));
//!
//! // Download the history
//! let fetched = engine.fetch_series()?;
//!
//! // Forecast the following month
//! let forecast = engine.forecast_next(&fetched.series)?;
//! println!("{}: {:.2}", forecast.forecast_month, forecast.forecast_value);
//! # Ok::<(), forecast_engine::ForecastError>(())
//! ```

pub mod data;
pub mod engine;
pub mod error;
pub mod models;
pub mod source;

// Re-export commonly used types
pub use crate::data::{TimeSeriesData, TimeSeriesPoint, YearMonth};
pub use crate::engine::{forecast_next, FetchedSeries, ForecastEngine, ForecastResult};
pub use crate::error::ForecastError;
pub use crate::models::{ForecastModel, ModelOrder, PointForecast, TrainedForecastModel};
pub use crate::source::{CsvSeriesSource, FredClient, InMemorySource, SeriesSource};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
