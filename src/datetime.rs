use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// A point in time with millisecond precision.
///
/// Wraps `chrono::NaiveDateTime` and adds the sentinel *invalid* value used
/// before the first observation is seen by the dispatcher or an analyzer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime(Option<NaiveDateTime>);

impl DateTime {
    /// The sentinel value used before any event has been observed.
    pub const INVALID: DateTime = DateTime(None);

    pub fn new(dt: NaiveDateTime) -> Self {
        Self(Some(dt))
    }

    pub fn from_ymd_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        let date = NaiveDate::from_ymd_opt(year, month, day).expect("invalid calendar date");
        let dt = date
            .and_hms_opt(hour, min, sec)
            .expect("invalid time of day");
        Self::new(dt)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    /// The calendar date, used to bucket intraday returns into daily returns.
    ///
    /// # Panics
    /// Panics if called on an invalid datetime.
    pub fn date(&self) -> NaiveDate {
        self.0.expect("date() called on an invalid DateTime").date()
    }

    pub fn inner(&self) -> Option<NaiveDateTime> {
        self.0
    }

    /// Signed number of whole days between `self` and `other` (`self - other`).
    pub fn days_since(&self, other: &DateTime) -> i64 {
        let a = self.0.expect("days_since: self is invalid");
        let b = other.0.expect("days_since: other is invalid");
        (a - b).num_days()
    }
}

impl fmt::Debug for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.3f")),
            None => write!(f, "<invalid>"),
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Default for DateTime {
    fn default() -> Self {
        DateTime::INVALID
    }
}
