//! Daily export schedule.

use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Timelike, Utc};

use crate::export::ExportError;

/// Fires once per day at a fixed UTC time of day.
///
/// Backed by a 6-field cron expression (`sec min hour * * *`), which the
/// scheduler re-arms after every fire regardless of the previous outcome.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    time: NaiveTime,
    cron: cron::Schedule,
}

impl DailySchedule {
    /// Create a schedule firing every day at `time` (UTC).
    ///
    /// # Errors
    /// Returns `ExportError::Config` if the derived cron expression is rejected.
    pub fn at(time: NaiveTime) -> Result<Self, ExportError> {
        let expr = cron_expression(time);
        let cron = cron::Schedule::from_str(&expr)
            .map_err(|e| ExportError::Config(format!("invalid cron expression '{expr}': {e}")))?;
        Ok(Self { time, cron })
    }

    /// Configured time of day.
    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// Cron expression handed to the job scheduler.
    pub fn cron_expression(&self) -> String {
        cron_expression(self.time)
    }

    /// First fire strictly after `now`.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cron.after(&now).next()
    }
}

impl std::fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "daily at {} UTC", self.time.format("%H:%M:%S"))
    }
}

fn cron_expression(time: NaiveTime) -> String {
    format!("{} {} {} * * *", time.second(), time.minute(), time.hour())
}
