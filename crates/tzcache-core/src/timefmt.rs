//! Time-string classification and formatting.
//!
//! The conversion API accepts exactly three shapes:
//!
//! - `yyyyMMdd` (8 chars) - a date, converted as local midnight
//! - `yyyyMMddThhmmss` (15 chars) - a local wall-clock datetime
//! - `yyyyMMddThhmmssZ` (16 chars) - already UTC, returned unchanged

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::error::{TzError, TzResult};

/// A classified conversion input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSpec {
    /// An 8-character date.
    Date(NaiveDate),
    /// A 15-character local datetime.
    Local(NaiveDateTime),
    /// A 16-character UTC datetime; conversion is the identity.
    Utc(NaiveDateTime),
}

impl TimeSpec {
    /// Classifies a time string, rejecting anything outside the three
    /// accepted shapes with a bad-date error.
    pub fn classify(s: &str) -> TzResult<Self> {
        let bad = || TzError::bad_date(format!("unparseable time: {s:?}"));
        match s.len() {
            8 => NaiveDate::parse_from_str(s, "%Y%m%d")
                .map(Self::Date)
                .map_err(|_| bad()),
            15 => NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                .map(Self::Local)
                .map_err(|_| bad()),
            16 if s.ends_with('Z') => {
                NaiveDateTime::parse_from_str(&s[..15], "%Y%m%dT%H%M%S")
                    .map(Self::Utc)
                    .map_err(|_| bad())
            }
            _ => Err(bad()),
        }
    }
}

/// Formats a UTC datetime as fixed-width `yyyyMMddThhmmssZ`.
///
/// Years outside 0..=9999 cannot be represented in the fixed-width
/// form; in practice unreachable, but rejected rather than truncated.
pub fn format_utc(utc: NaiveDateTime) -> TzResult<String> {
    if !(0..=9999).contains(&utc.year()) {
        return Err(TzError::bad_date(format!(
            "converted year {} outside fixed-width range",
            utc.year()
        )));
    }
    Ok(utc.format("%Y%m%dT%H%M%SZ").to_string())
}
