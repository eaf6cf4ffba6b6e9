//! Calendar-day utilities
//!
//! Date columns are labelled `M/d/yyyy` without leading zeros (e.g. `3/14/2024`).
//! "Today" is always computed on the server, in the configured time zone.

use crate::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse an IANA time zone name such as `Asia/Kolkata`
pub fn parse_time_zone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| Error::Config(format!("Unknown time zone '{}': {}", name, e)))
}

/// Source of "today" for attendance marking
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock projected into a fixed time zone
#[derive(Debug, Clone, Copy)]
pub struct ZonedClock {
    tz: Tz,
}

impl ZonedClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }
}

impl Clock for ZonedClock {
    fn today(&self) -> NaiveDate {
        now().with_timezone(&self.tz).date_naive()
    }
}

/// Clock pinned to a single day (tests, back-filling)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Canonical header label for a day: `3/14/2024`
pub fn date_label(day: NaiveDate) -> String {
    format!("{}/{}/{}", day.month(), day.day(), day.year())
}

/// Label safe for file names: `3-14-2024`
pub fn file_date_label(day: NaiveDate) -> String {
    format!("{}-{}-{}", day.month(), day.day(), day.year())
}

/// Interpret header text as a calendar day
///
/// Accepts `M/d/yyyy` with or without leading zeros, and ISO `yyyy-mm-dd`.
/// Two-digit years are rejected as ambiguous.
pub fn parse_date_label(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    let parts: Vec<&str> = text.split('/').collect();
    if parts.len() == 3 {
        if parts[2].len() != 4 || !parts.iter().all(|p| is_ascii_number(p)) {
            return None;
        }
        let month = parts[0].parse::<u32>().ok()?;
        let day = parts[1].parse::<u32>().ok()?;
        let year = parts[2].parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

fn is_ascii_number(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

/// True when both values denote the same (day, month, year)
pub fn same_day(a: NaiveDate, b: NaiveDate) -> bool {
    a.day() == b.day() && a.month() == b.month() && a.year() == b.year()
}
