//! Series sources: the FRED observations API and FRED-style CSV files

use crate::data::{TimeSeriesPoint, YearMonth};
use crate::error::{ForecastError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Anything that can deliver the full history of a named series
pub trait SeriesSource {
    /// Fetch every available observation of `series_id`, oldest first
    fn fetch_history(&self, series_id: &str) -> Result<Vec<TimeSeriesPoint>>;
}

impl<S: SeriesSource + ?Sized> SeriesSource for &S {
    fn fetch_history(&self, series_id: &str) -> Result<Vec<TimeSeriesPoint>> {
        (**self).fetch_history(series_id)
    }
}

impl<S: SeriesSource + ?Sized> SeriesSource for Box<S> {
    fn fetch_history(&self, series_id: &str) -> Result<Vec<TimeSeriesPoint>> {
        (**self).fetch_history(series_id)
    }
}

/// FRED marks missing observations with a single dot
const FRED_MISSING: &str = ".";

/// FRED observations API response
#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

/// FRED error body
#[derive(Debug, Deserialize)]
struct FredErrorBody {
    error_message: String,
}

/// Client for the FRED series observations endpoint
#[derive(Debug, Clone)]
pub struct FredClient {
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

impl FredClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.stlouisfed.org/fred";

    /// Create a client. A missing key is only reported when fetching.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn observations_url(&self) -> String {
        format!("{}/series/observations", self.base_url)
    }

    /// Parse an observations response body.
    ///
    /// Observations whose value is missing are skipped.
    pub fn parse_observations(body: &str) -> Result<Vec<TimeSeriesPoint>> {
        let response: ObservationsResponse = serde_json::from_str(body).map_err(|e| {
            ForecastError::UpstreamError(format!("Malformed FRED response: {}", e))
        })?;

        let mut points = Vec::with_capacity(response.observations.len());
        for obs in response.observations {
            if obs.value.trim() == FRED_MISSING {
                debug!(date = %obs.date, "Skipping missing FRED observation");
                continue;
            }
            let period: YearMonth = obs.date.parse().map_err(|e| {
                ForecastError::UpstreamError(format!("Bad observation date: {}", e))
            })?;
            let value: f64 = obs.value.trim().parse().map_err(|_| {
                ForecastError::UpstreamError(format!(
                    "Bad observation value '{}' at {}",
                    obs.value, obs.date
                ))
            })?;
            points.push(TimeSeriesPoint::new(period, value));
        }

        Ok(points)
    }
}

impl SeriesSource for FredClient {
    fn fetch_history(&self, series_id: &str) -> Result<Vec<TimeSeriesPoint>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ForecastError::ConfigurationError(
                "FRED_API_KEY not set in environment variables".to_string(),
            )
        })?;

        info!(series_id, "Fetching series history from FRED");

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ForecastError::UpstreamError(e.to_string()))?;

        let response = client
            .get(self.observations_url())
            .query(&[
                ("series_id", series_id),
                ("api_key", api_key),
                ("file_type", "json"),
            ])
            .send()
            .map_err(|e| ForecastError::UpstreamError(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ForecastError::UpstreamError(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<FredErrorBody>(&body)
                .map(|b| b.error_message)
                .unwrap_or(body);
            return Err(ForecastError::UpstreamError(format!(
                "FRED returned {}: {}",
                status, detail
            )));
        }

        let points = Self::parse_observations(&body)?;
        debug!(series_id, count = points.len(), "FRED observations parsed");
        Ok(points)
    }
}

/// Series source reading a FRED-style CSV download.
///
/// The first column holds the observation date, the second the value.
#[derive(Debug, Clone)]
pub struct CsvSeriesSource {
    path: PathBuf,
}

impl CsvSeriesSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<TimeSeriesPoint>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| {
                ForecastError::UpstreamError(format!(
                    "Cannot open {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        let mut points = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record =
                record.map_err(|e| ForecastError::UpstreamError(format!("CSV error: {}", e)))?;
            let (date, value) = match (record.get(0), record.get(1)) {
                (Some(date), Some(value)) => (date, value),
                _ => {
                    return Err(ForecastError::UpstreamError(format!(
                        "Row {} needs a date and a value column",
                        line + 2
                    )))
                }
            };
            if value.is_empty() || value == FRED_MISSING {
                continue;
            }

            let period: YearMonth = date
                .parse()
                .map_err(|e| ForecastError::UpstreamError(format!("Row {}: {}", line + 2, e)))?;
            let value: f64 = value.parse().map_err(|_| {
                ForecastError::UpstreamError(format!("Row {}: bad value '{}'", line + 2, value))
            })?;
            points.push(TimeSeriesPoint::new(period, value));
        }

        Ok(points)
    }
}

impl SeriesSource for CsvSeriesSource {
    fn fetch_history(&self, series_id: &str) -> Result<Vec<TimeSeriesPoint>> {
        info!(series_id, path = %self.path.display(), "Reading series history from CSV");
        self.read()
    }
}

/// Source serving a fixed set of points
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    points: Vec<TimeSeriesPoint>,
}

impl InMemorySource {
    pub fn new(points: Vec<TimeSeriesPoint>) -> Self {
        Self { points }
    }
}

impl SeriesSource for InMemorySource {
    fn fetch_history(&self, _series_id: &str) -> Result<Vec<TimeSeriesPoint>> {
        Ok(self.points.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_observations_skips_missing() {
        let body = r#"{
            "realtime_start": "2025-08-01",
            "observations": [
                {"realtime_start": "2025-08-01", "date": "2025-05-01", "value": "4.2"},
                {"realtime_start": "2025-08-01", "date": "2025-06-01", "value": "."},
                {"realtime_start": "2025-08-01", "date": "2025-07-01", "value": "4.3"}
            ]
        }"#;

        let points = FredClient::parse_observations(body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].period.to_string(), "2025-05");
        assert_eq!(points[1].value, 4.3);
    }

    #[test]
    fn test_parse_observations_malformed() {
        let err = FredClient::parse_observations("{\"nope\": []}").unwrap_err();
        assert!(err.is_upstream());

        let err = FredClient::parse_observations(
            r#"{"observations": [{"date": "2025-01-01", "value": "abc"}]}"#,
        )
        .unwrap_err();
        assert!(err.is_upstream());
    }

    #[test]
    fn test_missing_key_fails_before_network() {
        // Unroutable base URL: reaching the network would produce an upstream error instead
        let client = FredClient::new(None).with_base_url("http://127.0.0.1:9");
        let err = client.fetch_history("UNRATE").unwrap_err();
        assert!(matches!(err, ForecastError::ConfigurationError(_)));

        let blank = FredClient::new(Some("  ".to_string()));
        assert!(!blank.has_credential());
    }

    #[test]
    fn test_csv_source() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "observation_date,UNRATE").unwrap();
        writeln!(file, "2025-01-01,4.0").unwrap();
        writeln!(file, "2025-02-01,4.1").unwrap();
        writeln!(file, "2025-03-01,").unwrap();
        writeln!(file, "2025-04-01,4.2").unwrap();

        let points = CsvSeriesSource::new(file.path()).fetch_history("UNRATE").unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[2].period.to_string(), "2025-04");
    }

    #[test]
    fn test_csv_source_missing_file() {
        let err = CsvSeriesSource::new("no/such/file.csv")
            .fetch_history("UNRATE")
            .unwrap_err();
        assert!(err.is_upstream());
    }
}
