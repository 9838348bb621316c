//! Flat-file JSON persistence for the latest forecast and the subscriber list

use crate::error::{Result, ServiceError};
use chrono::{DateTime, Utc};
use forecast_engine::{FetchedSeries, ForecastResult, YearMonth};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// The persisted forecast: engine output plus the observation it extends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: DateTime<Utc>,
    pub forecast_value: f64,
    pub forecast_month: YearMonth,
    pub current_value: f64,
    pub current_month: YearMonth,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_95: Option<(f64, f64)>,
}

impl ForecastRecord {
    pub fn new(fetched: &FetchedSeries, forecast: &ForecastResult) -> Self {
        Self {
            date: forecast.generated_at,
            forecast_value: forecast.forecast_value,
            forecast_month: forecast.forecast_month,
            current_value: fetched.current_value,
            current_month: fetched.current_period,
            model: forecast.model.clone(),
            interval_95: forecast.interval_95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Added,
    AlreadySubscribed,
}

/// Check an address the way the subscription form does: non-empty, with an
/// `@` and a `.`. Returns the trimmed address.
pub fn validate_email(email: &str) -> Result<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ServiceError::MissingEmail);
    }
    if !email.contains('@') || !email.contains('.') {
        return Err(ServiceError::InvalidEmail(email.to_string()));
    }
    Ok(email.to_string())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Write through a uniquely named sibling temp file renamed over `path`,
/// so readers never see half a document and concurrent writers never share
/// a scratch file. The last rename wins.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(tmp.as_file_mut(), value)?;
    tmp.as_file_mut().flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Latest forecast, overwritten on every refresh
#[derive(Debug, Clone)]
pub struct ForecastStore {
    path: PathBuf,
}

impl ForecastStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored forecast, or `None` before the first refresh
    pub fn load(&self) -> Result<Option<ForecastRecord>> {
        read_json(&self.path)
    }

    pub fn save(&self, record: &ForecastRecord) -> Result<()> {
        write_json(&self.path, record)?;
        info!(path = %self.path.display(), forecast_month = %record.forecast_month, "Forecast saved");
        Ok(())
    }
}

/// Subscriber list. Read-modify-write cycles are serialized within the process.
#[derive(Debug)]
pub struct SubscriberStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SubscriberStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Subscriber>> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    pub fn save(&self, subscribers: &[Subscriber]) -> Result<()> {
        write_json(&self.path, subscribers)
    }

    /// Add `email` unless it is already on the list
    pub fn subscribe(&self, email: &str) -> Result<SubscribeOutcome> {
        let email = validate_email(email)?;
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut subscribers = self.load()?;
        if subscribers.iter().any(|s| s.email == email) {
            debug!(%email, "Already subscribed");
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        subscribers.push(Subscriber {
            email: email.clone(),
            subscribed_at: Utc::now(),
        });
        self.save(&subscribers)?;
        info!(%email, total = subscribers.len(), "New subscriber");
        Ok(SubscribeOutcome::Added)
    }

    /// Remove `email`. Removing an unknown address is not an error.
    pub fn unsubscribe(&self, email: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ServiceError::MissingEmail);
        }
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut subscribers = self.load()?;
        let before = subscribers.len();
        subscribers.retain(|s| s.email != email);
        self.save(&subscribers)?;
        if subscribers.len() < before {
            info!(%email, "Unsubscribed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record() -> ForecastRecord {
        ForecastRecord {
            date: "2025-08-04T09:00:00Z".parse().unwrap(),
            forecast_value: 4.3127,
            forecast_month: "2025-08".parse().unwrap(),
            current_value: 4.2,
            current_month: "2025-07".parse().unwrap(),
            model: "ARIMA(2,1,2)".to_string(),
            interval_95: None,
        }
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("  a@b.com ").unwrap(), "a@b.com");
        assert!(matches!(validate_email(""), Err(ServiceError::MissingEmail)));
        assert!(matches!(validate_email("   "), Err(ServiceError::MissingEmail)));
        assert!(matches!(validate_email("ab.com"), Err(ServiceError::InvalidEmail(_))));
        assert!(matches!(validate_email("a@bcom"), Err(ServiceError::InvalidEmail(_))));
    }

    #[test]
    fn test_forecast_store_missing_file() {
        let dir = tempdir().unwrap();
        let store = ForecastStore::new(dir.path().join("latest_forecast.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_forecast_store_round_trip_creates_dir() {
        let dir = tempdir().unwrap();
        let store = ForecastStore::new(dir.path().join("nested").join("latest_forecast.json"));
        store.save(&record()).unwrap();
        assert_eq!(store.load().unwrap(), Some(record()));

        let raw = fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["forecast_month"], "2025-08");
        assert_eq!(json["current_month"], "2025-07");
    }

    #[test]
    fn test_concurrent_saves_leave_a_whole_document() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempdir().unwrap();
        let store = Arc::new(ForecastStore::new(dir.path().join("latest_forecast.json")));

        for round in 0..50 {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        let mut rec = record();
                        // Different document lengths per writer
                        rec.model = "M".repeat(10 + i * 200);
                        store.save(&rec)
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }

            let loaded = store.load().unwrap().unwrap();
            assert!(loaded.model.chars().all(|c| c == 'M'), "round {}", round);
            assert_eq!((loaded.model.len() - 10) % 200, 0);
        }

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_subscribe_deduplicates() {
        let dir = tempdir().unwrap();
        let store = SubscriberStore::new(dir.path().join("subscribers.json"));

        assert_eq!(store.subscribe("a@b.com").unwrap(), SubscribeOutcome::Added);
        assert_eq!(
            store.subscribe(" a@b.com").unwrap(),
            SubscribeOutcome::AlreadySubscribed
        );
        assert_eq!(store.subscribe("c@d.org").unwrap(), SubscribeOutcome::Added);

        let emails: Vec<String> = store.load().unwrap().into_iter().map(|s| s.email).collect();
        assert_eq!(emails, vec!["a@b.com", "c@d.org"]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = SubscriberStore::new(dir.path().join("subscribers.json"));
        store.subscribe("a@b.com").unwrap();

        store.unsubscribe("a@b.com").unwrap();
        store.unsubscribe("a@b.com").unwrap();
        store.unsubscribe("never@seen.com").unwrap();
        assert!(store.load().unwrap().is_empty());
    }
}
