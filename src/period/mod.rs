pub mod buckets;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::date_util::{end_of_day, last_day_of_month, quarter_of, start_of_day, tick};
use crate::error::{Error, Result};

pub use buckets::{plan, spans, Bucket, Granularity};

/// Symbolic selector for the analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    ThisMonth,
    LastMonth,
    ThisQuarter,
    LastQuarter,
    ThisYear,
    #[default]
    LastYear,
    AllTime,
}

impl TimeRange {
    pub const ALL: [TimeRange; 7] = [
        TimeRange::ThisMonth,
        TimeRange::LastMonth,
        TimeRange::ThisQuarter,
        TimeRange::LastQuarter,
        TimeRange::ThisYear,
        TimeRange::LastYear,
        TimeRange::AllTime,
    ];

    /// Parse a range token. Unknown tokens fall back to `last_year`.
    pub fn parse(s: &str) -> Self {
        match Self::parse_strict(s) {
            Ok(range) => range,
            Err(_) => {
                log::warn!("Unrecognized time range {s:?}, falling back to last_year");
                TimeRange::default()
            }
        }
    }

    /// Parse a range token, rejecting anything outside the known set.
    /// Tokens match exactly; case and surrounding whitespace count.
    pub fn parse_strict(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| Error::InvalidRange(s.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ThisMonth => "this_month",
            TimeRange::LastMonth => "last_month",
            TimeRange::ThisQuarter => "this_quarter",
            TimeRange::LastQuarter => "last_quarter",
            TimeRange::ThisYear => "this_year",
            TimeRange::LastYear => "last_year",
            TimeRange::AllTime => "all_time",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::ThisMonth => "This Month",
            TimeRange::LastMonth => "Last Month",
            TimeRange::ThisQuarter => "This Quarter",
            TimeRange::LastQuarter => "Last Quarter",
            TimeRange::ThisYear => "This Year",
            TimeRange::LastYear => "Last Year",
            TimeRange::AllTime => "All Time",
        }
    }

    /// Resolve to a concrete calendar window relative to `now`.
    ///
    /// Calendar ranges run from 00:00:00 on their first day to 23:59:59 on
    /// their last day. `all_time` runs from the service epoch to `now`.
    pub fn resolve(&self, now: NaiveDateTime, epoch: NaiveDate) -> ResolvedWindow {
        let today = now.date();
        let (start, end) = match self {
            TimeRange::ThisMonth => month_bounds(today.year(), today.month()),
            TimeRange::LastMonth => {
                if today.month() == 1 {
                    month_bounds(today.year() - 1, 12)
                } else {
                    month_bounds(today.year(), today.month() - 1)
                }
            }
            TimeRange::ThisQuarter => quarter_bounds(today.year(), quarter_index(today)),
            TimeRange::LastQuarter => {
                let q = quarter_index(today);
                if q == 0 {
                    quarter_bounds(today.year() - 1, 3)
                } else {
                    quarter_bounds(today.year(), q - 1)
                }
            }
            TimeRange::ThisYear => year_bounds(today.year()),
            TimeRange::LastYear => year_bounds(today.year() - 1),
            TimeRange::AllTime => (start_of_day(epoch).min(now), now),
        };
        ResolvedWindow {
            start,
            end,
            label: self.label().to_string(),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn month_bounds(year: i32, month: u32) -> (NaiveDateTime, NaiveDateTime) {
    (
        start_of_day(NaiveDate::from_ymd_opt(year, month, 1).unwrap()),
        end_of_day(last_day_of_month(year, month)),
    )
}

fn quarter_index(d: NaiveDate) -> u32 {
    u32::from(quarter_of(d)) - 1
}

/// `quarter` is zero-based: months `[q*3, q*3+3)`.
fn quarter_bounds(year: i32, quarter: u32) -> (NaiveDateTime, NaiveDateTime) {
    let first_month = quarter * 3 + 1;
    (
        start_of_day(NaiveDate::from_ymd_opt(year, first_month, 1).unwrap()),
        end_of_day(last_day_of_month(year, first_month + 2)),
    )
}

fn year_bounds(year: i32) -> (NaiveDateTime, NaiveDateTime) {
    (
        start_of_day(NaiveDate::from_ymd_opt(year, 1, 1).unwrap()),
        end_of_day(NaiveDate::from_ymd_opt(year, 12, 31).unwrap()),
    )
}

/// The concrete `[start, end]` window of the current analysis period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub label: String,
}

impl ResolvedWindow {
    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    /// The window of equal length immediately preceding this one.
    pub fn previous(&self) -> ComparisonWindow {
        ComparisonWindow {
            start: self.start - self.length(),
            end: self.start - tick(),
        }
    }

    /// Everything inside the window.
    pub fn span(&self) -> Span {
        Span::between(self.start, self.end)
    }

    /// Everything up to and including the window end.
    pub fn as_of_end(&self) -> Span {
        Span::until(self.end)
    }
}

/// Preceding window used for growth comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ComparisonWindow {
    pub fn span(&self) -> Span {
        Span::between(self.start, self.end)
    }

    pub fn as_of_end(&self) -> Span {
        Span::until(self.end)
    }
}

/// Inclusive time predicate handed to the storage layer. `from: None`
/// means "since the beginning of recorded history".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub from: Option<NaiveDateTime>,
    pub to: NaiveDateTime,
}

impl Span {
    pub fn between(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self {
            from: Some(from),
            to,
        }
    }

    pub fn until(to: NaiveDateTime) -> Self {
        Self { from: None, to }
    }
}
