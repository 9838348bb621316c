//! Monthly time series data handling for forecasting

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month label such as `2025-07`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a new label, validating the month
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(ForecastError::DataError(format!(
                "Invalid year-month: {}-{}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        // Fields are validated on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The following calendar month.
    ///
    /// Uses calendar arithmetic, so December rolls over into January.
    pub fn succ(&self) -> Result<Self> {
        self.first_day()
            .checked_add_months(Months::new(1))
            .map(Self::from_date)
            .ok_or_else(|| {
                ForecastError::DataError(format!("No month follows {}", self))
            })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ForecastError;

    /// Accepts `YYYY-MM` or a full `YYYY-MM-DD` date (the day is ignored)
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let date = match s.len() {
            7 => NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d"),
            10 => NaiveDate::parse_from_str(s, "%Y-%m-%d"),
            _ => {
                return Err(ForecastError::DataError(format!(
                    "Expected YYYY-MM or YYYY-MM-DD, got: {}",
                    s
                )))
            }
        }
        .map_err(|e| ForecastError::DataError(format!("Invalid period '{}': {}", s, e)))?;

        Ok(Self::from_date(date))
    }
}

impl TryFrom<String> for YearMonth {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// One observation of a monthly series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period: YearMonth,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(period: YearMonth, value: f64) -> Self {
        Self { period, value }
    }
}

/// Ordered monthly time series.
///
/// Periods are strictly increasing, so there are no duplicates. Missing
/// months are not detected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesData {
    points: Vec<TimeSeriesPoint>,
}

impl TimeSeriesData {
    /// Create a series, validating ordering and values
    pub fn new(points: Vec<TimeSeriesPoint>) -> Result<Self> {
        for pair in points.windows(2) {
            if pair[1].period <= pair[0].period {
                return Err(ForecastError::DataError(format!(
                    "Periods must be strictly increasing: {} follows {}",
                    pair[1].period, pair[0].period
                )));
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(ForecastError::DataError(format!(
                "Non-finite value {} at {}",
                bad.value, bad.period
            )));
        }
        Ok(Self { points })
    }

    /// Create a series from `(period label, value)` pairs
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Result<Self> {
        let points = pairs
            .iter()
            .map(|(label, value)| Ok(TimeSeriesPoint::new(label.parse()?, *value)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(points)
    }

    /// Create a gap-free series of `values` starting at `start`
    pub fn monthly_from(start: YearMonth, values: &[f64]) -> Result<Self> {
        let mut period = start;
        let mut points = Vec::with_capacity(values.len());
        for (i, &value) in values.iter().enumerate() {
            if i > 0 {
                period = period.succ()?;
            }
            points.push(TimeSeriesPoint::new(period, value));
        }
        Self::new(points)
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    /// Observation values in period order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn periods(&self) -> Vec<YearMonth> {
        self.points.iter().map(|p| p.period).collect()
    }

    pub fn first(&self) -> Option<&TimeSeriesPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TimeSeriesPoint> {
        self.points.last()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Sub-series `[start, end)`; `None` runs to the end
    pub fn slice(&self, start: usize, end: Option<usize>) -> Result<Self> {
        let end = end.unwrap_or(self.points.len());
        if start > end || end > self.points.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Slice {}..{} out of bounds for series of length {}",
                start,
                end,
                self.points.len()
            )));
        }
        Ok(Self {
            points: self.points[start..end].to_vec(),
        })
    }

    /// Mean of the values
    pub fn mean(&self) -> Result<f64> {
        Ok(ts_math::stats::mean(&self.values())?)
    }

    /// Sample standard deviation of the values
    pub fn std_dev(&self) -> Result<f64> {
        Ok(ts_math::stats::std_dev(&self.values())?)
    }
}
