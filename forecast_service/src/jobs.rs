//! Refresh and notification cycles shared by the scheduler, the HTTP API and the CLI

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::notify::{mailer_from_config, ForecastEmail, Mailer};
use crate::store::{ForecastRecord, ForecastStore, SubscriberStore};
use forecast_engine::{ForecastEngine, SeriesSource};
use serde::Serialize;
use tracing::{error, info, warn};

/// Series source shared across threads
pub type DynSource = Box<dyn SeriesSource + Send + Sync>;

/// A recipient whose e-mail could not be delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub email: String,
    pub error: String,
}

/// Outcome of one notification cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotifySummary {
    pub sent: usize,
    pub failures: Vec<DeliveryFailure>,
}

/// Fetch the series, forecast the next month and persist the result
pub fn refresh_forecast<S: SeriesSource>(
    engine: &ForecastEngine<S>,
    store: &ForecastStore,
) -> Result<ForecastRecord> {
    info!(series_id = engine.series_id(), "Starting forecast refresh");
    let fetched = engine.fetch_series()?;
    let forecast = engine.forecast_next(&fetched.series)?;
    let record = ForecastRecord::new(&fetched, &forecast);
    store.save(&record)?;
    info!(
        forecast_month = %record.forecast_month,
        forecast_value = record.forecast_value,
        "Forecast refresh complete"
    );
    Ok(record)
}

/// E-mail the stored forecast to every subscriber.
///
/// A failed delivery is logged and recorded; the remaining subscribers are
/// still mailed.
pub fn notify_subscribers(
    forecasts: &ForecastStore,
    subscribers: &SubscriberStore,
    mailer: &dyn Mailer,
    public_url: &str,
) -> Result<NotifySummary> {
    let record = forecasts.load()?.ok_or(ServiceError::NoForecast)?;
    let subscribers = subscribers.load()?;
    if subscribers.is_empty() {
        info!("No subscribers to notify");
        return Ok(NotifySummary::default());
    }

    let mut summary = NotifySummary::default();
    for subscriber in &subscribers {
        let email = ForecastEmail::compose(&subscriber.email, &record, public_url);
        match mailer.send(&email) {
            Ok(()) => summary.sent += 1,
            Err(e) => {
                error!(email = %subscriber.email, error = %e, "Failed to send forecast email");
                summary.failures.push(DeliveryFailure {
                    email: subscriber.email.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        sent = summary.sent,
        failed = summary.failures.len(),
        "Notification cycle complete"
    );
    Ok(summary)
}

/// Everything a refresh or notification cycle needs
pub struct ServiceContext {
    pub engine: ForecastEngine<DynSource>,
    pub forecasts: ForecastStore,
    pub subscribers: SubscriberStore,
    pub mailer: Box<dyn Mailer>,
    pub public_url: String,
}

impl ServiceContext {
    pub fn new(
        engine: ForecastEngine<DynSource>,
        forecasts: ForecastStore,
        subscribers: SubscriberStore,
        mailer: Box<dyn Mailer>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            forecasts,
            subscribers,
            mailer,
            public_url: public_url.into(),
        }
    }

    /// FRED-backed context with SMTP delivery
    pub fn from_config(config: &ServiceConfig) -> Self {
        let source: DynSource = Box::new(config.fred_client());
        Self::new(
            ForecastEngine::new(source).with_series_id(config.fred.series_id.clone()),
            ForecastStore::new(config.storage.forecast_path()),
            SubscriberStore::new(config.storage.subscribers_path()),
            mailer_from_config(&config.email),
            config.server.public_url.clone(),
        )
    }

    pub fn refresh(&self) -> Result<ForecastRecord> {
        refresh_forecast(&self.engine, &self.forecasts)
    }

    pub fn notify(&self) -> Result<NotifySummary> {
        notify_subscribers(
            &self.forecasts,
            &self.subscribers,
            self.mailer.as_ref(),
            &self.public_url,
        )
    }

    /// Refresh, then mail the fresh forecast to everyone
    pub fn refresh_and_notify(&self) -> Result<(ForecastRecord, NotifySummary)> {
        let record = self.refresh()?;
        let summary = self.notify()?;
        Ok((record, summary))
    }

    /// Scheduled refresh: failures are logged and the cycle skipped
    pub fn scheduled_refresh(&self) {
        if let Err(e) = self.refresh() {
            error!(error = %e, "Scheduled forecast refresh failed");
        }
    }

    /// Scheduled notification: failures are logged and the cycle skipped
    pub fn scheduled_notification(&self) {
        match self.notify() {
            Ok(_) => {}
            Err(ServiceError::NoForecast) => warn!("No forecast available to send"),
            Err(e) => error!(error = %e, "Scheduled notification failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_engine::{InMemorySource, TimeSeriesData, YearMonth};
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct RecordingMailer {
        sent: Mutex<Vec<String>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, email: &ForecastEmail) -> Result<()> {
            self.sent.lock().unwrap().push(email.to.clone());
            Ok(())
        }
    }

    fn engine() -> ForecastEngine<DynSource> {
        let values: Vec<f64> = (0..48).map(|i| 4.0 + 0.3 * (i as f64 / 6.0).sin()).collect();
        let series = TimeSeriesData::monthly_from(YearMonth::new(2021, 1).unwrap(), &values).unwrap();
        let source: DynSource = Box::new(InMemorySource::new(series.points().to_vec()));
        ForecastEngine::new(source)
    }

    #[test]
    fn test_refresh_persists_record() {
        let dir = tempdir().unwrap();
        let store = ForecastStore::new(dir.path().join("latest_forecast.json"));

        let record = refresh_forecast(&engine(), &store).unwrap();
        assert_eq!(record.current_month.to_string(), "2024-12");
        assert_eq!(record.forecast_month.to_string(), "2025-01");
        assert!(record.forecast_value.is_finite());
        assert_eq!(store.load().unwrap(), Some(record));
    }

    #[test]
    fn test_notify_without_forecast() {
        let dir = tempdir().unwrap();
        let mailer = RecordingMailer {
            sent: Mutex::new(Vec::new()),
        };
        let err = notify_subscribers(
            &ForecastStore::new(dir.path().join("latest_forecast.json")),
            &SubscriberStore::new(dir.path().join("subscribers.json")),
            &mailer,
            "http://localhost:5000",
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::NoForecast));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_notify_mails_every_subscriber() {
        let dir = tempdir().unwrap();
        let forecasts = ForecastStore::new(dir.path().join("latest_forecast.json"));
        let subscribers = SubscriberStore::new(dir.path().join("subscribers.json"));
        refresh_forecast(&engine(), &forecasts).unwrap();
        subscribers.subscribe("a@b.com").unwrap();
        subscribers.subscribe("c@d.org").unwrap();

        let mailer = RecordingMailer {
            sent: Mutex::new(Vec::new()),
        };
        let summary =
            notify_subscribers(&forecasts, &subscribers, &mailer, "http://localhost:5000").unwrap();
        assert_eq!(summary.sent, 2);
        assert!(summary.failures.is_empty());
        assert_eq!(*mailer.sent.lock().unwrap(), vec!["a@b.com", "c@d.org"]);
    }
}
