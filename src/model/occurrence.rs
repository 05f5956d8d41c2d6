// File: ./src/model/occurrence.rs
// Annual recurrence of a fixed historical date inside a query window.
use crate::error::{Error, Result};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ISO_DATE: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` string.
pub fn parse_iso_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), ISO_DATE)
        .map_err(|e| Error::InvalidDate(format!("'{}': {}", input, e)))
}

/// How a February 29 anchor is placed in a common year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeapDayPolicy {
    /// Feb 29 overflows into March 1.
    #[default]
    RollForward,
    /// Feb 29 is pinned to February 28.
    Clamp,
}

impl fmt::Display for LeapDayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeapDayPolicy::RollForward => write!(f, "Roll forward to March 1"),
            LeapDayPolicy::Clamp => write!(f, "Clamp to February 28"),
        }
    }
}

impl LeapDayPolicy {
    /// Places `month`/`day` in `year`.
    /// The flag is true when the leap-day rule had to move the date.
    /// Returns None only when `year` is outside chrono's supported range.
    pub fn resolve(self, year: i32, month: u32, day: u32) -> Option<(NaiveDate, bool)> {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some((date, false));
        }
        if month == 2 && day == 29 {
            let moved = match self {
                LeapDayPolicy::RollForward => NaiveDate::from_ymd_opt(year, 3, 1),
                LeapDayPolicy::Clamp => NaiveDate::from_ymd_opt(year, 2, 28),
            }?;
            return Some((moved, true));
        }
        None
    }
}

/// The date an event historically happened (death, wedding, bnai mitzvah).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorDate(NaiveDate);

impl AnchorDate {
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| Error::InvalidDate(format!("{:04}-{:02}-{:02}", year, month, day)))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }
}

impl FromStr for AnchorDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_iso_date(s).map(Self)
    }
}

impl From<NaiveDate> for AnchorDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for AnchorDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(ISO_DATE))
    }
}

/// Inclusive date range `[start, end]`. Construction guarantees `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl QueryWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds a window from two ISO-8601 date strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_iso_date(start)?, parse_iso_date(end)?)
    }

    /// January 1 through December 31 of `year`.
    pub fn year_of(year: i32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| Error::InvalidDate(format!("year {}", year)))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| Error::InvalidDate(format!("year {}", year)))?;
        Self::new(start, end)
    }

    /// `start` through `start + days`.
    pub fn days_from(start: NaiveDate, days: u32) -> Result<Self> {
        let end = start
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| Error::InvalidDate(format!("{} + {} days", start, days)))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format(ISO_DATE),
            self.end.format(ISO_DATE)
        )
    }
}

/// A concrete date sharing the anchor's month and day, inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occurrence {
    date: NaiveDate,
    anchor: AnchorDate,
    leap_adjusted: bool,
}

impl Occurrence {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn anchor(&self) -> AnchorDate {
        self.anchor
    }

    /// True when a Feb 29 anchor was moved by the leap-day policy.
    pub fn is_leap_adjusted(&self) -> bool {
        self.leap_adjusted
    }

    pub fn to_iso_string(&self) -> String {
        self.date.format(ISO_DATE).to_string()
    }

    /// Whole years between the anchor and this occurrence (the "Nth yahrzeit").
    /// Negative when the anchor lies after the window it was matched in.
    pub fn years_since_anchor(&self) -> i32 {
        self.date.year() - self.anchor.year()
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_iso_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OccurrenceCalculator {
    policy: LeapDayPolicy,
}

impl OccurrenceCalculator {
    pub fn new(policy: LeapDayPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> LeapDayPolicy {
        self.policy
    }

    /// Finds the anchor's month/day inside `window`.
    ///
    /// The candidate starts in the window's start year. If it falls before the
    /// window start it moves forward by exactly one year; no further years are
    /// searched, so a window starting more than a year past the naive
    /// candidate can report no occurrence.
    pub fn next_occurrence(&self, anchor: AnchorDate, window: &QueryWindow) -> Option<Occurrence> {
        let month = anchor.month();
        let day = anchor.day();
        let year = window.start().year();

        let (mut candidate, mut leap_adjusted) = self.policy.resolve(year, month, day)?;
        if candidate < window.start() {
            (candidate, leap_adjusted) = self.policy.resolve(year.checked_add(1)?, month, day)?;
        }

        if window.contains(candidate) {
            Some(Occurrence {
                date: candidate,
                anchor,
                leap_adjusted,
            })
        } else {
            None
        }
    }
}

/// Next occurrence using the default leap-day policy.
pub fn next_occurrence(anchor: AnchorDate, window: &QueryWindow) -> Option<Occurrence> {
    OccurrenceCalculator::default().next_occurrence(anchor, window)
}
