//! # UNRATE Forecast
//!
//! Umbrella crate for the UNRATE forecast workspace.
//!
//! - [`math`]: statistics, Kalman filtering and optimization
//! - [`engine`]: series sources and the ARIMA(2,1,2) forecast
//! - [`service`]: persistence, scheduling, e-mail and the HTTP API
//!
//! ## Example
//!
//! ```
//! use unrate_forecast_workspace::engine::{forecast_next, TimeSeriesData, YearMonth};
//!
//! let values: Vec<f64> = (0..36).map(|i| 4.0 + 0.2 * (i as f64 / 4.0).sin()).collect();
//! let series = TimeSeriesData::monthly_from(YearMonth::new(2022, 1).unwrap(), &values).unwrap();
//! let forecast = forecast_next(&series).unwrap();
//! assert_eq!(forecast.forecast_month.to_string(), "2025-01");
//! ```

pub use forecast_engine as engine;
pub use forecast_service as service;
pub use ts_math as math;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports_line_up() {
        let month: engine::YearMonth = "2025-12".parse().unwrap();
        assert_eq!(month.succ().unwrap().to_string(), "2026-01");
        assert_eq!(service::store::validate_email("a@b.com").unwrap(), "a@b.com");
        assert_eq!(math::stats::mean(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
    }
}
