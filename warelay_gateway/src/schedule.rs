//! Time-of-day gate for automated replies.
//!
//! Evaluated at dispatch time, after the reply delay, never at receipt.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;

use warelay_config::ScheduleConfig;

use crate::error::Error;

/// Pure predicate: is this instant inside the allowed response window?
#[derive(Debug, Clone)]
pub struct ScheduleGate {
    zone: Tz,
    /// Weekday indices, 0 = Sunday .. 6 = Saturday, in the reference zone.
    weekdays: Vec<u8>,
    start_hour: u32,
    /// Exclusive.
    end_hour: u32,
}

impl ScheduleGate {
    #[must_use]
    pub const fn new(zone: Tz, weekdays: Vec<u8>, start_hour: u32, end_hour: u32) -> Self {
        Self {
            zone,
            weekdays,
            start_hour,
            end_hour,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> crate::Result<Self> {
        let zone: Tz = config
            .timezone
            .parse()
            .map_err(|_| Error::Config(format!("unknown timezone: {}", config.timezone)))?;
        Ok(Self::new(
            zone,
            config.weekdays.clone(),
            config.start_hour,
            config.end_hour,
        ))
    }

    #[must_use]
    pub fn allows(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.zone);
        let weekday = u8::try_from(local.weekday().num_days_from_sunday()).unwrap_or(u8::MAX);
        let hour = local.hour();
        self.weekdays.contains(&weekday) && hour >= self.start_hour && hour < self.end_hour
    }

    #[must_use]
    pub fn allows_now(&self) -> bool {
        self.allows(Utc::now())
    }
}
