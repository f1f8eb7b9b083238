//! Time-of-day handling for schedule records.
//!
//! Schedule sources report departures and arrivals as "HH:MM" strings with
//! no date attached. [`ClockTime`] keeps that shape. [`SequenceResolver`]
//! turns a run of clock times, listed in schedule order, into dated instants
//! relative to a reference time, handling runs that cross midnight.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of day with minute precision.
///
/// # Examples
///
/// ```
/// use departure_sensor::domain::ClockTime;
///
/// let time = ClockTime::parse_hhmm("14:30").unwrap();
/// assert_eq!(time.to_string(), "14:30");
///
/// // Adding minutes wraps around midnight
/// let late = ClockTime::parse_hhmm("23:55").unwrap();
/// assert_eq!(late.add_minutes(10).to_string(), "00:05");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    /// Create a clock time from hour and minute components.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Parse a time from "HH:MM" format.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// ```
    /// use departure_sensor::domain::ClockTime;
    ///
    /// assert!(ClockTime::parse_hhmm("00:00").is_ok());
    /// assert!(ClockTime::parse_hhmm(" 23:59 ").is_ok());
    ///
    /// assert!(ClockTime::parse_hhmm("1430").is_err());
    /// assert!(ClockTime::parse_hhmm("14:3").is_err());
    /// assert!(ClockTime::parse_hhmm("25:00").is_err());
    /// ```
    pub fn parse_hhmm(s: &str) -> Result<Self, TimeError> {
        let s = s.trim();

        // Must be exactly 5 characters: HH:MM
        if s.len() != 5 {
            return Err(TimeError::new("expected HH:MM format"));
        }

        let bytes = s.as_bytes();

        if bytes[2] != b':' {
            return Err(TimeError::new("expected colon at position 2"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }

        let minute = parse_two_digits(&bytes[3..5])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        Self::from_hm(hour, minute).ok_or_else(|| TimeError::new("invalid time"))
    }

    /// Returns the underlying `NaiveTime`.
    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// Returns the hour (0-23).
    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    /// Returns the minute (0-59).
    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Minutes elapsed since midnight.
    pub fn minutes_from_midnight(&self) -> i64 {
        self.hour() as i64 * 60 + self.minute() as i64
    }

    /// Add a (possibly negative) number of minutes, wrapping around midnight.
    ///
    /// Whole days are discarded first, so any `i64` is accepted.
    pub fn add_minutes(self, minutes: i64) -> Self {
        let within_day = minutes.rem_euclid(MINUTES_PER_DAY);
        let (time, _) = self.0.overflowing_add_signed(Duration::minutes(within_day));
        Self(time)
    }

    /// Anchor this time of day on a date.
    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.0)
    }
}

impl fmt::Debug for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClockTime({:02}:{:02})", self.hour(), self.minute())
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Threshold for detecting midnight rollover in time sequences.
///
/// If a time appears more than 6 hours before the previous time in the
/// sequence, we assume it has rolled over to the next day.
const ROLLOVER_THRESHOLD_HOURS: i64 = 6;

/// Assigns dates to clock times listed in schedule order.
///
/// The first time is compared against the reference time of day, each
/// following time against its predecessor. A time more than 6 hours "before"
/// the previous one is taken to be on the next day. A time slightly before
/// the reference stays on the reference date, so records that have just left
/// resolve to the past rather than to tomorrow.
///
/// ```
/// use chrono::NaiveDate;
/// use departure_sensor::domain::{ClockTime, SequenceResolver};
///
/// let reference = NaiveDate::from_ymd_opt(2024, 3, 15)
///     .unwrap()
///     .and_hms_opt(23, 40, 0)
///     .unwrap();
/// let mut resolver = SequenceResolver::new(reference);
///
/// let before_midnight = resolver.resolve(ClockTime::parse_hhmm("23:50").unwrap());
/// let after_midnight = resolver.resolve(ClockTime::parse_hhmm("00:15").unwrap());
///
/// assert_eq!(before_midnight.date(), reference.date());
/// assert_eq!(after_midnight.date(), reference.date().succ_opt().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct SequenceResolver {
    date: NaiveDate,
    prev_minutes: i64,
}

impl SequenceResolver {
    /// Start a sequence at the given reference time.
    pub fn new(reference: NaiveDateTime) -> Self {
        let time = reference.time();
        Self {
            date: reference.date(),
            prev_minutes: time.hour() as i64 * 60 + time.minute() as i64,
        }
    }

    /// Resolve the next time in the sequence to a dated instant.
    pub fn resolve(&mut self, time: ClockTime) -> NaiveDateTime {
        let curr_minutes = time.minutes_from_midnight();
        if curr_minutes - self.prev_minutes < -(ROLLOVER_THRESHOLD_HOURS * 60) {
            self.date = self.date.succ_opt().unwrap_or(self.date);
        }
        self.prev_minutes = curr_minutes;
        time.on(self.date)
    }
}
