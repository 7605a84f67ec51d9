//! Daily reminder job.
//!
//! Once a day at a fixed wall-clock time, every opted-in user gets one
//! `reminder` notification for that calendar day. `tick(now)` does one
//! pass and is safe to repeat: a user who already has a reminder for the
//! day is skipped, and the store's per-day uniqueness covers overlapping
//! runs. Missed days are not backfilled.

use std::sync::Arc;

use chrono::{
    DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, TimeZone, Utc,
};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::models::notification::DailyReminder;
use crate::notification::PreferenceGate;
use crate::store::{NotificationStore, UserDirectory};

pub const DEFAULT_REMINDER_MESSAGE: &str = "Don't forget to log your workout and meals today!";

/// Clock the reminder's wall-clock time and calendar day are read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderZone {
    /// Host local time. The offset is looked up per instant, so DST
    /// changes keep the fire time at the same wall-clock hour.
    Local,
    /// Explicit FITTRACK_REMINDER_UTC_OFFSET.
    Fixed(FixedOffset),
}

/// When the job fires: a wall-clock time of day in a `ReminderZone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSchedule {
    pub at: NaiveTime,
    pub zone: ReminderZone,
}

impl ReminderSchedule {
    pub fn new(at: NaiveTime, offset: FixedOffset) -> Self {
        Self {
            at,
            zone: ReminderZone::Fixed(offset),
        }
    }

    pub fn local(at: NaiveTime) -> Self {
        Self {
            at,
            zone: ReminderZone::Local,
        }
    }

    /// The calendar day containing `now` and that day's local midnight.
    pub fn day_bounds(&self, now: DateTime<Utc>) -> (NaiveDate, DateTime<Utc>) {
        match self.zone {
            ReminderZone::Local => day_bounds_in(&Local, now),
            ReminderZone::Fixed(offset) => day_bounds_in(&offset, now),
        }
    }

    /// First fire time strictly after `now`.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.zone {
            ReminderZone::Local => next_fire_in(&Local, self.at, now),
            ReminderZone::Fixed(offset) => next_fire_in(&offset, self.at, now),
        }
    }
}

fn day_bounds_in<Tz: TimeZone>(tz: &Tz, now: DateTime<Utc>) -> (NaiveDate, DateTime<Utc>) {
    let day = now.with_timezone(tz).date_naive();
    (day, local_to_utc(tz, day.and_time(NaiveTime::MIN)))
}

fn next_fire_in<Tz: TimeZone>(tz: &Tz, at: NaiveTime, now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_timezone(tz)
        .date_naive()
        .iter_days()
        .take(3)
        .map(|day| local_to_utc(tz, day.and_time(at)))
        .find(|fire| *fire > now)
        .unwrap_or(now + Duration::days(1))
}

fn local_to_utc<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        // Inside a spring-forward gap: shift by the offset in force before it.
        LocalResult::None => {
            let before = tz.offset_from_utc_datetime(&local).fix();
            let utc = local - Duration::seconds(i64::from(before.local_minus_utc()));
            Utc.from_utc_datetime(&utc)
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReminderRunSummary {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct ReminderJob {
    notifications: Arc<dyn NotificationStore>,
    users: Arc<dyn UserDirectory>,
    gate: PreferenceGate,
    schedule: ReminderSchedule,
    message: String,
}

impl ReminderJob {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        users: Arc<dyn UserDirectory>,
        schedule: ReminderSchedule,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notifications,
            gate: PreferenceGate::new(users.clone()),
            users,
            schedule,
            message: message.into(),
        }
    }

    pub fn schedule(&self) -> ReminderSchedule {
        self.schedule
    }

    /// One pass over all opted-in users. Fails only if users cannot be
    /// enumerated; per-user failures are logged and counted.
    pub async fn tick(&self, now: DateTime<Utc>) -> anyhow::Result<ReminderRunSummary> {
        let (day, day_start) = self.schedule.day_bounds(now);
        let users = self.users.opted_in_users().await?;
        debug!(%day, users = users.len(), "reminder_job: starting pass");

        let mut summary = ReminderRunSummary::default();
        for user_id in users {
            match self.remind(user_id, day, day_start, now).await {
                Ok(true) => summary.created += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(user_id = %user_id, %day, error = %e, "reminder_job: user failed, continuing");
                }
            }
        }

        metrics::record_reminders("created", summary.created);
        metrics::record_reminders("skipped", summary.skipped);
        metrics::record_reminders("failed", summary.failed);
        Ok(summary)
    }

    async fn remind(
        &self,
        user_id: Uuid,
        day: NaiveDate,
        day_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        // The user may have opted out since the scan started.
        if !self.gate.allows(user_id).await? {
            return Ok(false);
        }
        let reminder = DailyReminder {
            user_id,
            day,
            day_start,
            message: self.message.clone(),
            date: now,
        };
        Ok(self.notifications.insert_daily_reminder(&reminder).await?.is_some())
    }
}

/// Owns the single timer that drives `ReminderJob::tick` once a day.
pub struct ReminderScheduler {
    job: Arc<ReminderJob>,
}

impl ReminderScheduler {
    pub fn new(job: Arc<ReminderJob>) -> Self {
        Self { job }
    }

    /// Spawn the timer task. Call this once at startup.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = self.job.schedule().next_fire_after(now);
                let wait = (next - now).to_std().unwrap_or_default();
                debug!(next_run = %next, "reminder_job: sleeping until next run");
                time::sleep(wait).await;

                match self.job.tick(Utc::now()).await {
                    Ok(s) => info!(
                        created = s.created,
                        skipped = s.skipped,
                        failed = s.failed,
                        "reminder_job: pass complete"
                    ),
                    Err(e) => error!("reminder_job: pass aborted: {}", e),
                }
            }
        })
    }
}
