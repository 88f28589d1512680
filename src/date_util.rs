use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Storage format for every timestamp column. Fixed width, so lexical
/// order in SQLite matches chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Smallest distinguishable step between two stored timestamps.
pub fn tick() -> Duration {
    Duration::milliseconds(1)
}

/// Get the last day of a given month.
pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap() - Duration::days(1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).unwrap() - Duration::days(1)
    }
}

/// Get the quarter (1-4) for a given date.
pub fn quarter_of(d: NaiveDate) -> u8 {
    ((d.month() - 1) / 3 + 1) as u8
}

/// Midnight at the start of `d`.
pub fn start_of_day(d: NaiveDate) -> NaiveDateTime {
    d.and_time(NaiveTime::MIN)
}

/// 23:59:59 on `d`, the inclusive end used for calendar periods.
pub fn end_of_day(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_opt(23, 59, 59).unwrap()
}

/// Shift a timestamp by whole calendar months, clamping the day to the
/// target month's length (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(ts: NaiveDateTime, months: i32) -> NaiveDateTime {
    let total = ts.year() * 12 + ts.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = ts.day().min(last_day_of_month(year, month).day());
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_time(ts.time())
}

/// Format a timestamp the way it is stored.
pub fn to_key(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a user-supplied timestamp. Accepts the storage format, a plain
/// `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS`, or a bare date (midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(start_of_day)
        })
}
