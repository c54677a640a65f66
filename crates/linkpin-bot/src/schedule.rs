use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use linkpin_common::{BotConfig, ConfigError};

/// Daily reset trigger: a cron schedule evaluated in a fixed timezone.
///
/// Polled from the main loop. If several occurrences were missed (process suspended), the
/// reset fires once and the next occurrence is computed from `now`.
#[derive(Debug, Clone)]
pub struct ResetSchedule {
    schedule: Schedule,
    timezone: Tz,
    next_due: Option<DateTime<Tz>>,
}

impl ResetSchedule {
    pub fn new(schedule: Schedule, timezone: Tz, now: DateTime<Utc>) -> Self {
        let next_due = schedule.after(&now.with_timezone(&timezone)).next();
        Self {
            schedule,
            timezone,
            next_due,
        }
    }

    /// `None` when the reset is disabled in config.
    pub fn from_config(config: &BotConfig, now: DateTime<Utc>) -> Result<Option<Self>, ConfigError> {
        if !config.reset.enabled {
            return Ok(None);
        }
        let schedule = config.reset_schedule()?;
        let timezone = config.reset_timezone()?;
        Ok(Some(Self::new(schedule, timezone, now)))
    }

    pub fn next_due(&self) -> Option<DateTime<Tz>> {
        self.next_due
    }

    /// True when an occurrence has passed since the last call.
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due.with_timezone(&Utc) {
            return false;
        }
        self.next_due = self
            .schedule
            .after(&now.with_timezone(&self.timezone))
            .next();
        true
    }
}
