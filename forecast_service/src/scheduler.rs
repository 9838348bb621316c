//! Weekly and bi-weekly job scheduling on the tokio runtime

use crate::error::{Result, ServiceError};
use chrono::{DateTime, Datelike, Days, Utc, Weekday};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Fires on one weekday at a fixed UTC time, every `week_interval` ISO weeks.
///
/// A week qualifies when `(iso_week - 1) % week_interval == 0`, so an
/// interval of 2 fires on odd ISO weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyTrigger {
    weekday: Weekday,
    hour: u32,
    minute: u32,
    week_interval: u32,
}

impl WeeklyTrigger {
    pub fn new(weekday: Weekday, hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(ServiceError::Configuration(format!(
                "Invalid trigger time {:02}:{:02}",
                hour, minute
            )));
        }
        Ok(Self {
            weekday,
            hour,
            minute,
            week_interval: 1,
        })
    }

    pub fn every_weeks(mut self, week_interval: u32) -> Result<Self> {
        if week_interval == 0 {
            return Err(ServiceError::Configuration(
                "Week interval must be at least 1".to_string(),
            ));
        }
        self.week_interval = week_interval;
        Ok(self)
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn week_interval(&self) -> u32 {
        self.week_interval
    }

    /// The first firing instant strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.date_naive();
        // An ISO year can end on week 53, so allow one extra interval
        let horizon = 7 * (u64::from(self.week_interval) + 1) + 7;

        (0..=horizon)
            .filter_map(|offset| start.checked_add_days(Days::new(offset)))
            .filter(|day| {
                day.weekday() == self.weekday
                    && (day.iso_week().week() - 1) % self.week_interval == 0
            })
            .filter_map(|day| day.and_hms_opt(self.hour, self.minute, 0))
            .map(|naive| naive.and_utc())
            .find(|candidate| *candidate > after)
    }
}

impl fmt::Display for WeeklyTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:{:02} UTC", self.weekday, self.hour, self.minute)?;
        if self.week_interval > 1 {
            write!(f, " every {} weeks", self.week_interval)?;
        }
        Ok(())
    }
}

/// Synchronous job body; runs on the blocking pool
pub type JobHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct ScheduledJob {
    pub id: String,
    pub trigger: WeeklyTrigger,
    handler: JobHandler,
}

impl fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("id", &self.id)
            .field("trigger", &self.trigger)
            .finish()
    }
}

/// Named jobs, each driven by its own tokio task once started
#[derive(Debug, Default)]
pub struct JobScheduler {
    jobs: Vec<ScheduledJob>,
}

impl JobScheduler {
    pub const WEEKLY_FETCH: &'static str = "weekly_fetch";
    pub const BIWEEKLY_EMAIL: &'static str = "biweekly_email";

    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. A job with the same id is replaced.
    pub fn add_job<F>(&mut self, id: impl Into<String>, trigger: WeeklyTrigger, handler: F) -> &mut Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = id.into();
        self.jobs.retain(|job| job.id != id);
        self.jobs.push(ScheduledJob {
            id,
            trigger,
            handler: Arc::new(handler),
        });
        self
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Next firing time of every job after `now`
    pub fn next_runs(&self, now: DateTime<Utc>) -> Vec<(String, Option<DateTime<Utc>>)> {
        self.jobs
            .iter()
            .map(|job| (job.id.clone(), job.trigger.next_after(now)))
            .collect()
    }

    /// Run a job's handler on the calling thread, outside its schedule
    pub fn run_now(&self, id: &str) -> bool {
        match self.jobs.iter().find(|job| job.id == id) {
            Some(job) => {
                (job.handler)();
                true
            }
            None => false,
        }
    }

    /// Spawn one task per job. Must be called inside a tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        let tasks = self
            .jobs
            .into_iter()
            .map(|job| {
                info!(job = %job.id, trigger = %job.trigger, "Job scheduled");
                tokio::spawn(run_job(job))
            })
            .collect();
        SchedulerHandle { tasks }
    }
}

async fn run_job(job: ScheduledJob) {
    loop {
        let now = Utc::now();
        let Some(next) = job.trigger.next_after(now) else {
            warn!(job = %job.id, "Trigger has no future run, stopping job");
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        info!(job = %job.id, next_run = %next, "Waiting for next run");
        tokio::time::sleep(wait).await;

        info!(job = %job.id, "Running job");
        let handler = Arc::clone(&job.handler);
        if let Err(e) = tokio::task::spawn_blocking(move || handler()).await {
            error!(job = %job.id, error = %e, "Job panicked");
        }
    }
}

/// Running scheduler tasks
#[derive(Debug)]
pub struct SchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn job_count(&self) -> usize {
        self.tasks.len()
    }

    /// Stop every job task
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        info!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_rejects_bad_times() {
        assert!(WeeklyTrigger::new(Weekday::Mon, 24, 0).is_err());
        assert!(WeeklyTrigger::new(Weekday::Mon, 9, 60).is_err());
        assert!(WeeklyTrigger::new(Weekday::Mon, 9, 0)
            .unwrap()
            .every_weeks(0)
            .is_err());
    }

    #[test]
    fn test_next_monday() {
        let trigger = WeeklyTrigger::new(Weekday::Mon, 9, 0).unwrap();
        // 2025-08-06 is a Wednesday
        assert_eq!(
            trigger.next_after(at("2025-08-06T12:00:00Z")),
            Some(at("2025-08-11T09:00:00Z"))
        );
        // Earlier the same Monday
        assert_eq!(
            trigger.next_after(at("2025-08-11T08:59:59Z")),
            Some(at("2025-08-11T09:00:00Z"))
        );
    }

    #[test]
    fn test_strictly_after() {
        let trigger = WeeklyTrigger::new(Weekday::Mon, 9, 0).unwrap();
        assert_eq!(
            trigger.next_after(at("2025-08-11T09:00:00Z")),
            Some(at("2025-08-18T09:00:00Z"))
        );
    }

    #[test]
    fn test_biweekly_uses_odd_iso_weeks() {
        let trigger = WeeklyTrigger::new(Weekday::Mon, 10, 0)
            .unwrap()
            .every_weeks(2)
            .unwrap();
        // 2025-08-04 is ISO week 32, 2025-08-11 is week 33
        assert_eq!(
            trigger.next_after(at("2025-08-01T00:00:00Z")),
            Some(at("2025-08-11T10:00:00Z"))
        );
        assert_eq!(
            trigger.next_after(at("2025-08-11T10:00:00Z")),
            Some(at("2025-08-25T10:00:00Z"))
        );
    }

    #[test]
    fn test_display() {
        let trigger = WeeklyTrigger::new(Weekday::Mon, 10, 0)
            .unwrap()
            .every_weeks(2)
            .unwrap();
        assert_eq!(trigger.to_string(), "Mon 10:00 UTC every 2 weeks");
    }

    #[test]
    fn test_add_replace_and_run_now() {
        let counter = Arc::new(AtomicUsize::new(0));
        let trigger = WeeklyTrigger::new(Weekday::Mon, 9, 0).unwrap();

        let mut scheduler = JobScheduler::new();
        let c = Arc::clone(&counter);
        scheduler.add_job(JobScheduler::WEEKLY_FETCH, trigger, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let c = Arc::clone(&counter);
        scheduler.add_job(JobScheduler::WEEKLY_FETCH, trigger, move || {
            c.fetch_add(10, Ordering::SeqCst);
        });

        assert_eq!(scheduler.jobs().len(), 1);
        assert!(scheduler.run_now(JobScheduler::WEEKLY_FETCH));
        assert!(!scheduler.run_now("missing"));
        assert_eq!(counter.load(Ordering::SeqCst), 10);

        let runs = scheduler.next_runs(at("2025-08-06T12:00:00Z"));
        assert_eq!(
            runs,
            vec![(
                JobScheduler::WEEKLY_FETCH.to_string(),
                Some(at("2025-08-11T09:00:00Z"))
            )]
        );
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let mut scheduler = JobScheduler::new();
        scheduler.add_job("noop", WeeklyTrigger::new(Weekday::Sun, 3, 30).unwrap(), || {});
        let handle = scheduler.start();
        assert_eq!(handle.job_count(), 1);
        handle.shutdown();
    }
}
