//! # Forecast Service
//!
//! Keeps the latest UNRATE forecast on disk and mails it to subscribers.
//!
//! - [`jobs`]: the refresh and notification cycles
//! - [`scheduler`]: weekly refresh, bi-weekly e-mail
//! - [`routes`]: JSON API and landing page (axum)
//! - [`store`]: flat-file JSON persistence
//! - [`notify`]: e-mail composition and SMTP delivery

pub mod config;
pub mod error;
pub mod jobs;
pub mod notify;
pub mod routes;
pub mod scheduler;
pub mod store;

pub use crate::config::ServiceConfig;
pub use crate::error::{Result, ServiceError};
pub use crate::jobs::{notify_subscribers, refresh_forecast, NotifySummary, ServiceContext};
pub use crate::notify::{ForecastEmail, Mailer, SmtpMailer};
pub use crate::routes::create_router;
pub use crate::scheduler::{JobScheduler, WeeklyTrigger};
pub use crate::store::{ForecastRecord, ForecastStore, SubscribeOutcome, Subscriber, SubscriberStore};

use chrono::Weekday;
use std::sync::Arc;

/// The standard schedule: refresh every Monday 09:00, e-mail every other Monday 10:00
pub fn default_scheduler(ctx: Arc<ServiceContext>) -> Result<JobScheduler> {
    let mut scheduler = JobScheduler::new();

    let refresh_ctx = Arc::clone(&ctx);
    scheduler.add_job(
        JobScheduler::WEEKLY_FETCH,
        WeeklyTrigger::new(Weekday::Mon, 9, 0)?,
        move || refresh_ctx.scheduled_refresh(),
    );

    scheduler.add_job(
        JobScheduler::BIWEEKLY_EMAIL,
        WeeklyTrigger::new(Weekday::Mon, 10, 0)?.every_weeks(2)?,
        move || ctx.scheduled_notification(),
    );

    Ok(scheduler)
}
