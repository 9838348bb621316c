//! Series acquisition and one-step-ahead forecasting

use crate::data::{TimeSeriesData, YearMonth};
use crate::error::{ForecastError, Result};
use crate::models::arima::ArimaModel;
use crate::models::{ForecastModel, ModelOrder, TrainedForecastModel};
use crate::source::SeriesSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Series forecast by default
pub const DEFAULT_SERIES_ID: &str = "UNRATE";

/// Fixed model order
pub const MODEL_ORDER: ModelOrder = ModelOrder::new(2, 1, 2);

/// A fetched history with its latest observation split out
#[derive(Debug, Clone)]
pub struct FetchedSeries {
    pub series: TimeSeriesData,
    pub current_value: f64,
    pub current_period: YearMonth,
    pub fetched_at: DateTime<Utc>,
}

/// Forecast for the month after the last observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub forecast_value: f64,
    pub forecast_month: YearMonth,
    pub model: String,
    pub generated_at: DateTime<Utc>,
    /// 95% prediction interval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_95: Option<(f64, f64)>,
}

/// Fetches a series and forecasts its next value
#[derive(Debug, Clone)]
pub struct ForecastEngine<S> {
    source: S,
    series_id: String,
}

impl<S: SeriesSource> ForecastEngine<S> {
    /// Engine for the default series
    pub fn new(source: S) -> Self {
        Self {
            source,
            series_id: DEFAULT_SERIES_ID.to_string(),
        }
    }

    pub fn with_series_id(mut self, series_id: impl Into<String>) -> Self {
        self.series_id = series_id.into();
        self
    }

    pub fn series_id(&self) -> &str {
        &self.series_id
    }

    /// Download the full history and split off the latest observation.
    ///
    /// An empty or out-of-order history is an upstream failure.
    pub fn fetch_series(&self) -> Result<FetchedSeries> {
        let points = self.source.fetch_history(&self.series_id)?;
        let series = TimeSeriesData::new(points).map_err(|e| {
            ForecastError::UpstreamError(format!("Malformed {} series: {}", self.series_id, e))
        })?;

        let current = *series.last().ok_or_else(|| {
            ForecastError::UpstreamError(format!("{} series is empty", self.series_id))
        })?;

        info!(
            series_id = %self.series_id,
            observations = series.len(),
            current_period = %current.period,
            current_value = current.value,
            "Series fetched"
        );

        Ok(FetchedSeries {
            series,
            current_value: current.value,
            current_period: current.period,
            fetched_at: Utc::now(),
        })
    }

    /// Forecast the month after the last point of `series`
    pub fn forecast_next(&self, series: &TimeSeriesData) -> Result<ForecastResult> {
        forecast_next(series)
    }
}

/// Fit the fixed ARIMA order to `series` and forecast one month ahead.
///
/// The forecast month is derived from the last observation, never from
/// the current date.
pub fn forecast_next(series: &TimeSeriesData) -> Result<ForecastResult> {
    let last = series.last().ok_or_else(|| {
        ForecastError::ForecastingError("Cannot forecast an empty series".to_string())
    })?;
    let forecast_month = last.period.succ()?;

    let model = ArimaModel::new(MODEL_ORDER.p, MODEL_ORDER.d, MODEL_ORDER.q)?;
    let trained = model.train(series)?;
    let forecast = trained.forecast_one_step()?;

    info!(
        model = trained.name(),
        %forecast_month,
        forecast_value = forecast.mean,
        std_error = forecast.std_error,
        "Forecast generated"
    );

    Ok(ForecastResult {
        forecast_value: forecast.mean,
        forecast_month,
        model: trained.name().to_string(),
        generated_at: Utc::now(),
        interval_95: forecast.interval(0.95).ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimeSeriesPoint;
    use crate::source::InMemorySource;

    #[test]
    fn test_fetch_splits_current() {
        let points = vec![
            TimeSeriesPoint::new("2025-01".parse().unwrap(), 4.0),
            TimeSeriesPoint::new("2025-02".parse().unwrap(), 4.1),
        ];
        let engine = ForecastEngine::new(InMemorySource::new(points));
        let fetched = engine.fetch_series().unwrap();
        assert_eq!(fetched.series.len(), 2);
        assert_eq!(fetched.current_value, 4.1);
        assert_eq!(fetched.current_period.to_string(), "2025-02");
    }

    #[test]
    fn test_fetch_empty_is_upstream_error() {
        let engine = ForecastEngine::new(InMemorySource::default());
        let err = engine.fetch_series().unwrap_err();
        assert!(matches!(err, ForecastError::UpstreamError(_)));
    }

    #[test]
    fn test_fetch_out_of_order_is_upstream_error() {
        let points = vec![
            TimeSeriesPoint::new("2025-02".parse().unwrap(), 4.0),
            TimeSeriesPoint::new("2025-01".parse().unwrap(), 4.1),
        ];
        let err = ForecastEngine::new(InMemorySource::new(points))
            .fetch_series()
            .unwrap_err();
        assert!(err.is_upstream());
    }

    #[test]
    fn test_result_serializes_flat() {
        let result = ForecastResult {
            forecast_value: 4.25,
            forecast_month: "2025-08".parse().unwrap(),
            model: "ARIMA(2,1,2)".to_string(),
            generated_at: "2025-07-15T10:00:00Z".parse().unwrap(),
            interval_95: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["forecast_month"], "2025-08");
        assert_eq!(json["model"], "ARIMA(2,1,2)");
        assert!(json.get("interval_95").is_none());
    }
}
