//! Parsed timezone offset rules.
//!
//! A [`TimeZoneDefinition`] is the in-memory form of one VTIMEZONE
//! component fetched from the timezone service. Grammar parsing is
//! delegated to the `icalendar` crate; this module only interprets the
//! STANDARD/DAYLIGHT observances (DTSTART, TZOFFSETFROM, TZOFFSETTO,
//! yearly RRULEs, RDATEs) to answer "what is the UTC offset at this
//! local wall-clock time".

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use icalendar::parser;
use tracing::{debug, warn};

use crate::error::{TzError, TzResult};
use crate::id::TzId;

/// A UTC offset in seconds (positive east of UTC, negative west).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtcOffset {
    seconds: i32,
}

impl UtcOffset {
    /// Creates an offset from total seconds.
    pub const fn from_seconds(seconds: i32) -> Self {
        Self { seconds }
    }

    /// Creates an offset from hours and minutes.
    pub const fn from_hms(hours: i32, minutes: i32, seconds: i32) -> Self {
        Self {
            seconds: hours * 3600 + minutes * 60 + seconds,
        }
    }

    /// Returns the offset in seconds.
    pub fn seconds(&self) -> i32 {
        self.seconds
    }

    /// Returns the offset as a chrono duration.
    pub fn as_duration(&self) -> Duration {
        Duration::seconds(i64::from(self.seconds))
    }

    /// Parses an iCalendar UTC offset (`+0500`, `-0800`, `+053000`).
    pub fn parse(s: &str) -> TzResult<Self> {
        let s = s.trim();
        let (sign, digits) = match s.split_at_checked(1) {
            Some(("+", rest)) => (1, rest),
            Some(("-", rest)) => (-1, rest),
            _ => return Err(TzError::invalid_response(format!("bad UTC offset: {s:?}"))),
        };
        if digits.len() != 4 && digits.len() != 6 {
            return Err(TzError::invalid_response(format!("bad UTC offset: {s:?}")));
        }
        let field = |range: std::ops::Range<usize>| -> TzResult<i32> {
            digits
                .get(range)
                .and_then(|f| f.parse::<i32>().ok())
                .ok_or_else(|| TzError::invalid_response(format!("bad UTC offset: {s:?}")))
        };
        let hours = field(0..2)?;
        let minutes = field(2..4)?;
        let seconds = if digits.len() == 6 { field(4..6)? } else { 0 };
        Ok(Self::from_hms(sign * hours, sign * minutes, sign * seconds))
    }
}

impl std::fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.seconds >= 0 { '+' } else { '-' };
        let total = self.seconds.abs();
        let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
        if s == 0 {
            write!(f, "{sign}{h:02}{m:02}")
        } else {
            write!(f, "{sign}{h:02}{m:02}{s:02}")
        }
    }
}

/// Whether an observance describes standard or daylight time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservanceKind {
    /// Standard time (e.g. EST).
    Standard,
    /// Daylight saving time (e.g. EDT).
    Daylight,
}

impl ObservanceKind {
    /// Returns the component name for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
        }
    }
}

/// One STANDARD or DAYLIGHT observance rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Observance {
    /// Standard or daylight.
    pub kind: ObservanceKind,
    /// Offset in effect before this observance's transitions.
    pub offset_from: UtcOffset,
    /// Offset in effect once this observance applies.
    pub offset_to: UtcOffset,
    /// First transition, in local wall-clock time.
    pub dtstart: NaiveDateTime,
    /// Yearly recurrence rule for the transition, if any.
    pub rrule: Option<String>,
    /// Explicit additional transition dates.
    pub rdates: Vec<NaiveDateTime>,
    /// Abbreviated name (e.g. "EST").
    pub tzname: Option<String>,
}

/// Parsed offset rules for one timezone id.
///
/// Read-only after construction; the service shares definitions with
/// callers behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeZoneDefinition {
    /// The canonical id this definition was published under.
    pub tzid: TzId,
    /// Observance rules, in document order.
    pub observances: Vec<Observance>,
}

impl TimeZoneDefinition {
    /// Parses raw iCalendar text containing a VTIMEZONE component.
    ///
    /// The surrounding VCALENDAR wrapper is optional; the first
    /// VTIMEZONE found anywhere in the document is used.
    pub fn parse(raw: &str) -> TzResult<Self> {
        let unfolded = parser::unfold(raw);
        let calendar = parser::read_calendar(&unfolded)
            .map_err(|e| TzError::invalid_response(format!("unparseable iCalendar text: {e}")))?;

        let vtimezone = find_component(&calendar.components, "VTIMEZONE").ok_or_else(|| {
            TzError::invalid_response("no VTIMEZONE component in service response")
        })?;

        let tzid = property(vtimezone, "TZID")
            .ok_or_else(|| TzError::invalid_response("VTIMEZONE missing TZID"))?;

        let mut observances = Vec::new();
        for child in &vtimezone.components {
            let kind = match child.name.as_str() {
                "STANDARD" => ObservanceKind::Standard,
                "DAYLIGHT" => ObservanceKind::Daylight,
                other => {
                    debug!(component = %other, "skipping unknown VTIMEZONE child");
                    continue;
                }
            };
            observances.push(parse_observance(child, kind)?);
        }

        if observances.is_empty() {
            return Err(TzError::invalid_response(format!(
                "VTIMEZONE {} has no STANDARD or DAYLIGHT observance",
                tzid
            )));
        }

        Ok(Self {
            tzid: TzId::new(tzid),
            observances,
        })
    }

    /// Returns the UTC offset in effect at the given local wall-clock time.
    ///
    /// Picks the observance with the most recent transition at or before
    /// `local`. Times before every transition get the earliest
    /// observance's `offset_from`.
    pub fn offset_at(&self, local: NaiveDateTime) -> UtcOffset {
        let mut best: Option<(&Observance, NaiveDateTime)> = None;
        for obs in &self.observances {
            if let Some(effective) = latest_transition(obs, local)
                && best.is_none_or(|(_, at)| effective > at)
            {
                best = Some((obs, effective));
            }
        }

        match best {
            Some((obs, _)) => obs.offset_to,
            None => self
                .observances
                .iter()
                .min_by_key(|obs| obs.dtstart)
                .map_or(UtcOffset::from_seconds(0), |obs| obs.offset_from),
        }
    }

    /// Converts a local wall-clock time to UTC using these rules.
    pub fn to_utc(&self, local: NaiveDateTime) -> NaiveDateTime {
        local - self.offset_at(local).as_duration()
    }
}

/// Finds a named component anywhere in a component tree.
fn find_component<'a>(
    components: &'a [parser::Component<'a>],
    name: &str,
) -> Option<&'a parser::Component<'a>> {
    for component in components {
        if component.name.as_str().eq_ignore_ascii_case(name) {
            return Some(component);
        }
        if let Some(found) = find_component(&component.components, name) {
            return Some(found);
        }
    }
    None
}

/// Returns a property value by name, if present.
fn property<'a>(component: &'a parser::Component<'a>, name: &str) -> Option<&'a str> {
    component
        .properties
        .iter()
        .find(|p| p.name.as_str().eq_ignore_ascii_case(name))
        .map(|p| p.val.as_str())
}

fn required<'a>(
    component: &'a parser::Component<'a>,
    name: &'static str,
    kind: ObservanceKind,
) -> TzResult<&'a str> {
    property(component, name).ok_or_else(|| {
        TzError::invalid_response(format!("{} observance missing {}", kind.as_str(), name))
    })
}

fn parse_observance(component: &parser::Component<'_>, kind: ObservanceKind) -> TzResult<Observance> {
    let dtstart_raw = required(component, "DTSTART", kind)?;
    let dtstart = parse_local_datetime(dtstart_raw).ok_or_else(|| {
        TzError::invalid_response(format!("bad DTSTART in {}: {dtstart_raw:?}", kind.as_str()))
    })?;

    let offset_from = UtcOffset::parse(required(component, "TZOFFSETFROM", kind)?)?;
    let offset_to = UtcOffset::parse(required(component, "TZOFFSETTO", kind)?)?;

    let rdates = component
        .properties
        .iter()
        .filter(|p| p.name.as_str().eq_ignore_ascii_case("RDATE"))
        .flat_map(|p| p.val.as_str().split(','))
        .filter_map(parse_local_datetime)
        .collect();

    Ok(Observance {
        kind,
        offset_from,
        offset_to,
        dtstart,
        rrule: property(component, "RRULE").map(str::to_string),
        rdates,
        tzname: property(component, "TZNAME").map(str::to_string),
    })
}

/// Parses a local `yyyyMMddThhmmss` value or an 8-character date form
/// (taken as local midnight, as `RDATE;VALUE=DATE` publishes). A
/// trailing `Z` is tolerated, as some published observances carry one.
fn parse_local_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_end_matches('Z');
    if s.len() == 8 {
        return NaiveDate::parse_from_str(s, "%Y%m%d")
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN));
    }
    NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").ok()
}

/// Returns the most recent transition of `obs` at or before `at`.
fn latest_transition(obs: &Observance, at: NaiveDateTime) -> Option<NaiveDateTime> {
    if at < obs.dtstart {
        return None;
    }

    let mut best = obs.dtstart;
    for rdate in &obs.rdates {
        if *rdate <= at && *rdate > best {
            best = *rdate;
        }
    }

    if let Some(rrule) = &obs.rrule
        && let Some(occurrence) = latest_rrule_occurrence(obs, rrule, at)
        && occurrence > best
    {
        best = occurrence;
    }

    Some(best)
}

/// Evaluates the most recent yearly RRULE occurrence at or before `at`.
///
/// Timezone transition rules in practice are `FREQ=YEARLY` with
/// `BYMONTH` and an ordinal `BYDAY` (e.g. `2SU`, `-1SU`), retired by an
/// `UNTIL` bound in full-history definitions; anything else is ignored
/// with a warning and the observance falls back to DTSTART and RDATEs.
fn latest_rrule_occurrence(obs: &Observance, rrule: &str, at: NaiveDateTime) -> Option<NaiveDateTime> {
    let parts: std::collections::HashMap<&str, &str> = rrule
        .split(';')
        .filter_map(|part| part.split_once('='))
        .collect();

    if parts.get("FREQ") != Some(&"YEARLY") {
        warn!(rrule = %rrule, "unsupported transition rule frequency");
        return None;
    }
    let month: u32 = parts.get("BYMONTH")?.parse().ok()?;
    let (ordinal, weekday) = parse_byday(parts.get("BYDAY")?)?;

    // UNTIL is published in UTC; re-express it on this observance's
    // pre-transition local clock so occurrences compare directly.
    let until = match parts.get("UNTIL") {
        Some(raw) => {
            let Some(parsed) = parse_local_datetime(raw) else {
                warn!(rrule = %rrule, "unparseable UNTIL in transition rule");
                return None;
            };
            if raw.trim().ends_with('Z') {
                Some(parsed + obs.offset_from.as_duration())
            } else {
                Some(parsed)
            }
        }
        None => None,
    };

    // Walk backwards from the last candidate year; the occurrence in
    // that year may still be in the future or past UNTIL, in which
    // case an earlier year wins.
    let time = obs.dtstart.time();
    let last_year = until.map_or(at.year(), |u| u.year().min(at.year()));
    for year in (obs.dtstart.year()..=last_year).rev() {
        if let Some(occurrence) = nth_weekday_of_month(year, month, weekday, ordinal, time)
            && occurrence <= at
            && occurrence >= obs.dtstart
            && until.is_none_or(|u| occurrence <= u)
        {
            return Some(occurrence);
        }
    }
    None
}

/// Parses a BYDAY value like `1SU`, `2MO`, `-1SU`.
fn parse_byday(s: &str) -> Option<(i32, Weekday)> {
    let s = s.trim();
    if s.len() < 2 {
        return None;
    }
    let ordinal_part = s.get(..s.len() - 2)?;
    let day_part = s.get(s.len() - 2..)?;
    if ordinal_part.is_empty() {
        return None;
    }
    let ordinal: i32 = ordinal_part.parse().ok()?;
    let weekday = match day_part.to_ascii_uppercase().as_str() {
        "SU" => Weekday::Sun,
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        _ => return None,
    };
    Some((ordinal, weekday))
}

/// Returns the nth (or nth-from-last, for negative `ordinal`) given
/// weekday of a month, at `time`.
fn nth_weekday_of_month(
    year: i32,
    month: u32,
    weekday: Weekday,
    ordinal: i32,
    time: NaiveTime,
) -> Option<NaiveDateTime> {
    if ordinal == 0 {
        return None;
    }

    if ordinal > 0 {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let days_until = (weekday.num_days_from_monday() as i32
            - first.weekday().num_days_from_monday() as i32
            + 7)
            % 7;
        let day = 1 + days_until + (ordinal - 1) * 7;
        let date = NaiveDate::from_ymd_opt(year, month, u32::try_from(day).ok()?)?;
        Some(NaiveDateTime::new(date, time))
    } else {
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
        let days_back = (last.weekday().num_days_from_monday() as i32
            - weekday.num_days_from_monday() as i32
            + 7)
            % 7;
        let day = last.day() as i32 - days_back + (ordinal + 1) * 7;
        let date = NaiveDate::from_ymd_opt(year, month, u32::try_from(day).ok()?)?;
        Some(NaiveDateTime::new(date, time))
    }
}
