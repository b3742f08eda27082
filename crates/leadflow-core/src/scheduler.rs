//! Daily scheduler: one fixed local wall-clock time per day in a named zone.
//!
//! The configured "HH:mm" is validated when the scheduler is built, so a bad
//! value fails at startup rather than at first fire. Misfires are not
//! reported; the callback owns its own error handling.

use std::{fmt, future::Future, str::FromStr, sync::Arc, time::Duration};

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{ports::Clock, Error, Result};

/// Upper bound when skipping forward over a DST gap.
const MAX_GAP_MINUTES: i64 = 180;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailyTime {
    pub hour: u32,
    pub minute: u32,
}

impl DailyTime {
    /// Parse "HH:mm" (hour 0-23, minute 0-59).
    pub fn parse(raw: &str) -> Result<Self> {
        let bad = || Error::Config(format!("Bad DEFAULT_DAILY_TIME: {raw} (expected HH:mm)"));

        let (h, m) = raw.trim().split_once(':').ok_or_else(bad)?;
        let (h, m) = (h.trim(), m.trim());
        if h.is_empty()
            || m.is_empty()
            || !h.chars().all(|c| c.is_ascii_digit())
            || !m.chars().all(|c| c.is_ascii_digit())
        {
            return Err(bad());
        }

        let hour: u32 = h.parse().map_err(|_| bad())?;
        let minute: u32 = m.parse().map_err(|_| bad())?;
        if hour > 23 || minute > 59 {
            return Err(bad());
        }
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for DailyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// A daily cron trigger (`0 m h * * *`) evaluated on the wall clock of `tz`.
#[derive(Clone, Debug)]
pub struct DailySchedule {
    pub time: DailyTime,
    pub tz: Tz,
    cron: Schedule,
}

impl DailySchedule {
    pub fn new(time: DailyTime, tz: Tz) -> Result<Self> {
        let expr = cron_expression(time);
        let cron = Schedule::from_str(&expr)
            .map_err(|e| Error::Config(format!("Invalid cron expression '{expr}': {e}")))?;
        Ok(Self { time, tz, cron })
    }

    /// Six-field cron string (`sec min hour dom mon dow`).
    pub fn cron_expression(&self) -> String {
        cron_expression(self.time)
    }

    /// First instant strictly after `after` whose local time in `tz` is `time`.
    ///
    /// The cron schedule runs over naive wall-clock time; each occurrence is
    /// then placed in `tz`. A time that falls in a DST gap fires at the first
    /// valid local minute after it; an ambiguous (repeated) time fires at the
    /// earlier instant.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let wall = Utc.from_utc_datetime(&after.with_timezone(&self.tz).naive_local());

        self.cron
            .after(&wall)
            .take(3)
            .filter_map(|occurrence| self.resolve_local(occurrence.naive_utc()))
            .find(|candidate| *candidate > after)
    }

    fn resolve_local(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        for skip in 0..=MAX_GAP_MINUTES {
            let t = naive + chrono::Duration::minutes(skip);
            match self.tz.from_local_datetime(&t) {
                LocalResult::Single(dt) => return Some(dt.with_timezone(&Utc)),
                LocalResult::Ambiguous(earliest, _) => return Some(earliest.with_timezone(&Utc)),
                LocalResult::None => continue,
            }
        }
        None
    }
}

fn cron_expression(time: DailyTime) -> String {
    format!("0 {} {} * * *", time.minute, time.hour)
}

pub struct DailyScheduler {
    schedule: DailySchedule,
    clock: Arc<dyn Clock>,
}

impl DailyScheduler {
    /// Validates `raw_time` before anything is registered.
    pub fn new(raw_time: &str, tz: Tz, clock: Arc<dyn Clock>) -> Result<Self> {
        let time = DailyTime::parse(raw_time)?;
        Ok(Self {
            schedule: DailySchedule::new(time, tz)?,
            clock,
        })
    }

    /// Register the recurring trigger. `job` receives the scheduled instant.
    pub fn start<F, Fut>(&self, job: F) -> ScheduledJob
    where
        F: Fn(DateTime<Utc>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let schedule = self.schedule.clone();
        let clock = self.clock.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tracing::info!(
            time = %schedule.time,
            tz = %schedule.tz.name(),
            cron = %schedule.cron_expression(),
            "scheduling daily job"
        );

        let handle = tokio::spawn(async move {
            let mut cursor = clock.now();
            loop {
                let Some(next) = schedule.next_after(cursor) else {
                    tracing::error!(time = %schedule.time, "daily job has no next run (stopping)");
                    break;
                };
                let wait = (next - clock.now()).to_std().unwrap_or(Duration::ZERO);
                tracing::debug!(next = %next, wait_secs = wait.as_secs(), "daily job armed");

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = sleep(wait) => {
                        job(next).await;
                        let now = clock.now();
                        cursor = if now > next { now } else { next };
                    }
                }
            }
        });

        ScheduledJob { cancel, handle }
    }
}

/// Handle to a running daily trigger.
pub struct ScheduledJob {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledJob {
    /// Stop and wait for the loop to exit. A run already in progress finishes first.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "daily job task ended abnormally");
        }
    }
}
