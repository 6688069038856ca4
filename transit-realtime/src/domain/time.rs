//! Service-day time handling.
//!
//! Transit schedules express times as seconds since midnight of the
//! *service day*, not the calendar day. A trip that leaves at 23:50 and
//! arrives at 00:20 is recorded as 23:50 → 24:20 on the same service day,
//! so times may exceed 24 hours. This module provides types for parsing and
//! shifting those times between adjacent service days.

use chrono::NaiveDate;
use std::fmt;
use std::ops::{Add, Sub};

/// Seconds in one service day.
pub const SECONDS_PER_DAY: i32 = 86_400;

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

/// A time of day relative to the start of a service day.
///
/// Stored as signed seconds since midnight. Values above 24:00:00 are
/// valid and denote trips that run past midnight on their service day.
///
/// # Examples
///
/// ```
/// use transit_realtime::domain::ServiceTime;
///
/// let t = ServiceTime::parse_hms("25:10:00").unwrap();
/// assert_eq!(t.seconds(), 25 * 3600 + 600);
/// assert_eq!(t.to_string(), "25:10:00");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ServiceTime(i32);

impl ServiceTime {
    /// Create a time from seconds since service-day midnight.
    pub const fn from_seconds(seconds: i32) -> Self {
        Self(seconds)
    }

    /// Create a time from hours, minutes and seconds.
    pub const fn hms(hours: i32, minutes: i32, seconds: i32) -> Self {
        Self(hours * 3600 + minutes * 60 + seconds)
    }

    /// Parse a time in "HH:MM:SS" or "H:MM:SS" format.
    ///
    /// Hours may exceed 23 (up to 47) for trips running past midnight.
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_realtime::domain::ServiceTime;
    ///
    /// assert!(ServiceTime::parse_hms("08:00:00").is_ok());
    /// assert!(ServiceTime::parse_hms("8:00:00").is_ok());
    /// assert!(ServiceTime::parse_hms("47:59:59").is_ok());
    ///
    /// assert!(ServiceTime::parse_hms("08:00").is_err());
    /// assert!(ServiceTime::parse_hms("08:60:00").is_err());
    /// assert!(ServiceTime::parse_hms("48:00:00").is_err());
    /// ```
    pub fn parse_hms(s: &str) -> Result<Self, TimeError> {
        let mut parts = s.split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimeError::new("expected HH:MM:SS format"));
        };

        if h.is_empty() || h.len() > 2 {
            return Err(TimeError::new("hour must have one or two digits"));
        }
        let hour = parse_digits(h.as_bytes()).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > 47 {
            return Err(TimeError::new("hour must be 0-47"));
        }

        let minute = parse_two_digits(m.as_bytes())
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        let second = parse_two_digits(sec.as_bytes())
            .ok_or_else(|| TimeError::new("invalid second digits"))?;
        if second > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }

        Ok(Self::hms(hour, minute, second))
    }

    /// Returns the raw seconds since service-day midnight.
    pub const fn seconds(self) -> i32 {
        self.0
    }

    /// Returns this time expressed relative to the previous service day.
    ///
    /// 01:00 today is 25:00 yesterday.
    pub const fn on_previous_day(self) -> Self {
        Self(self.0 + SECONDS_PER_DAY)
    }

    /// Returns this time expressed relative to the next service day.
    ///
    /// 01:00 today is -23:00 tomorrow.
    pub const fn on_next_day(self) -> Self {
        Self(self.0 - SECONDS_PER_DAY)
    }
}

impl Add<i32> for ServiceTime {
    type Output = Self;

    fn add(self, rhs: i32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub for ServiceTime {
    type Output = i32;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl From<i32> for ServiceTime {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<ServiceTime> for i32 {
    fn from(value: ServiceTime) -> Self {
        value.0
    }
}

impl fmt::Debug for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceTime({self})")
    }
}

impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{sign}{:02}:{:02}:{:02}",
            abs / 3600,
            (abs / 60) % 60,
            abs % 60
        )
    }
}

/// A service day, identified by its calendar date.
///
/// Service days anchor `ServiceTime`s. Searches that may catch trips
/// crossing midnight query the previous, current and next service days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceDay {
    date: NaiveDate,
}

impl ServiceDay {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The service day before this one, if representable.
    pub fn previous(&self) -> Option<Self> {
        self.date.pred_opt().map(Self::new)
    }

    /// The service day after this one, if representable.
    pub fn next(&self) -> Option<Self> {
        self.date.succ_opt().map(Self::new)
    }
}

impl From<NaiveDate> for ServiceDay {
    fn from(date: NaiveDate) -> Self {
        Self::new(date)
    }
}

impl fmt::Display for ServiceDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date)
    }
}

/// Parse two ASCII digit bytes into an i32.
fn parse_two_digits(bytes: &[u8]) -> Option<i32> {
    if bytes.len() != 2 {
        return None;
    }
    parse_digits(bytes)
}

fn parse_digits(bytes: &[u8]) -> Option<i32> {
    bytes.iter().try_fold(0i32, |acc, &b| {
        let d = (b as char).to_digit(10)?;
        Some(acc * 10 + d as i32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_valid_times() {
        let t = ServiceTime::parse_hms("00:00:00").unwrap();
        assert_eq!(t.seconds(), 0);

        let t = ServiceTime::parse_hms("23:59:59").unwrap();
        assert_eq!(t.seconds(), 86_399);

        let t = ServiceTime::parse_hms("7:05:30").unwrap();
        assert_eq!(t.seconds(), 7 * 3600 + 5 * 60 + 30);
    }

    #[test]
    fn parse_past_midnight() {
        let t = ServiceTime::parse_hms("24:30:00").unwrap();
        assert_eq!(t.seconds(), SECONDS_PER_DAY + 1800);
    }

    #[test]
    fn parse_invalid_format() {
        assert!(ServiceTime::parse_hms("").is_err());
        assert!(ServiceTime::parse_hms("08:00").is_err());
        assert!(ServiceTime::parse_hms("08:00:00:00").is_err());
        assert!(ServiceTime::parse_hms("08-00-00").is_err());
        assert!(ServiceTime::parse_hms("ab:cd:ef").is_err());
        assert!(ServiceTime::parse_hms("123:00:00").is_err());
        assert!(ServiceTime::parse_hms("08:0:00").is_err());
    }

    #[test]
    fn parse_invalid_values() {
        assert!(ServiceTime::parse_hms("48:00:00").is_err());
        assert!(ServiceTime::parse_hms("12:60:00").is_err());
        assert!(ServiceTime::parse_hms("12:00:60").is_err());
    }

    #[test]
    fn display_format() {
        assert_eq!(ServiceTime::hms(9, 5, 3).to_string(), "09:05:03");
        assert_eq!(ServiceTime::hms(25, 0, 0).to_string(), "25:00:00");
        assert_eq!(ServiceTime::from_seconds(-60).to_string(), "-00:01:00");
    }

    #[test]
    fn shift_between_days() {
        let t = ServiceTime::hms(1, 0, 0);
        assert_eq!(t.on_previous_day(), ServiceTime::hms(25, 0, 0));
        assert_eq!(t.on_next_day().seconds(), 3600 - SECONDS_PER_DAY);
    }

    #[test]
    fn service_day_neighbours() {
        let day = ServiceDay::new(date(2024, 3, 1));
        assert_eq!(day.previous().unwrap().date(), date(2024, 2, 29));
        assert_eq!(day.next().unwrap().date(), date(2024, 3, 2));
    }
}
