//! Service-day time-of-day → absolute instant.
//!
//! Arrival feeds only carry `HH:MM:SS`. The calendar date is taken from the
//! reference instant, with one narrow exception: late in the evening (after
//! 20:59) an early-morning time (before 04:00) is read as tomorrow. This is a
//! heuristic for "buses running past midnight", not general service-day
//! reasoning. A 03:30 bus seen at 19:00 is *not* rolled over; it computes as a
//! negative offset and the arrival processor drops it.
//!
//! Hours of 24 and above (`25:10:00`) are accepted and land on the next day.

use chrono::{DateTime, Duration, TimeZone, Timelike};

use crate::error::TimeError;

/// Rollover applies when the reference hour is strictly greater than this...
pub const ROLLOVER_REFERENCE_AFTER_HOUR: u32 = 20;
/// ...and the parsed hour is strictly less than this.
pub const ROLLOVER_TARGET_BEFORE_HOUR: u32 = 4;

const MAX_SERVICE_HOUR: u32 = 47;

/// Parsed `HH:MM:SS`. `hours` may exceed 23.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTime {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl ServiceTime {
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TimeError::Missing);
        }
        let malformed = || TimeError::Malformed(s.to_string());

        let mut parts = trimmed.split(':');
        let mut field = |max: u32| -> Result<u32, TimeError> {
            let part = parts.next().ok_or_else(malformed)?;
            if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            let value: u32 = part.parse().map_err(|_| malformed())?;
            if value > max {
                return Err(malformed());
            }
            Ok(value)
        };

        let hours = field(MAX_SERVICE_HOUR)?;
        let minutes = field(59)?;
        let seconds = field(59)?;
        if parts.next().is_some() {
            return Err(malformed());
        }

        Ok(Self {
            hours,
            minutes,
            seconds,
        })
    }

    fn since_midnight(&self) -> Duration {
        Duration::seconds(i64::from(self.hours * 3600 + self.minutes * 60 + self.seconds))
    }
}

/// Resolve `time_of_day` against the calendar date of `reference`.
pub fn normalize<Tz: TimeZone>(
    time_of_day: &str,
    reference: &DateTime<Tz>,
) -> Result<DateTime<Tz>, TimeError> {
    let parsed = ServiceTime::parse(time_of_day)?;
    let nonexistent = || TimeError::Nonexistent(time_of_day.to_string());

    let local = reference.naive_local();
    let mut date = local.date();
    if local.hour() > ROLLOVER_REFERENCE_AFTER_HOUR && parsed.hours < ROLLOVER_TARGET_BEFORE_HOUR {
        date = date.succ_opt().ok_or_else(nonexistent)?;
    }

    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(nonexistent)?;
    let naive = midnight
        .checked_add_signed(parsed.since_midnight())
        .ok_or_else(nonexistent)?;

    // Ambiguous local times (DST fall-back) resolve to the earlier instant;
    // times inside a spring-forward gap do not exist and are rejected.
    reference
        .timezone()
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(nonexistent)
}

/// Whole minutes from `reference` to `target`, floored (−30 s → −1, 90 s → 1).
pub fn minutes_until<Tz: TimeZone>(target: &DateTime<Tz>, reference: &DateTime<Tz>) -> i64 {
    target
        .clone()
        .signed_duration_since(reference.clone())
        .num_milliseconds()
        .div_euclid(60_000)
}
