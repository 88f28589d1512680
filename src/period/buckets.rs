use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use super::{ResolvedWindow, Span, TimeRange};
use crate::date_util::{add_months, tick};

/// Step size of a trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Weekly,
    Monthly,
}

impl Granularity {
    /// Single-month views get weekly points, everything else monthly.
    pub fn for_range(range: TimeRange) -> Self {
        match range {
            TimeRange::ThisMonth | TimeRange::LastMonth => Granularity::Weekly,
            _ => Granularity::Monthly,
        }
    }

    /// The `n`th step from `anchor`. Always measured from the anchor so a
    /// day clamped in a short month does not carry into later steps.
    fn nth(&self, anchor: NaiveDateTime, n: u32) -> NaiveDateTime {
        match self {
            Granularity::Weekly => anchor + Duration::days(7 * i64::from(n)),
            Granularity::Monthly => add_months(anchor, n as i32),
        }
    }
}

/// One point of a trend series.
///
/// `start` is the stepped date the label is derived from; `boundary` is the
/// inclusive upper edge of the bucket, clamped to the window end for the
/// last bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub label: String,
    pub start: NaiveDateTime,
    pub boundary: NaiveDateTime,
}

/// Split a window into consecutive buckets covering `[start, end]`.
pub fn plan(window: &ResolvedWindow, range: TimeRange) -> Vec<Bucket> {
    let granularity = Granularity::for_range(range);
    let mut buckets = Vec::new();
    let mut n = 0;
    let mut cursor = window.start;
    while cursor <= window.end {
        n += 1;
        let next = granularity.nth(window.start, n);
        let boundary = if next > window.end {
            window.end
        } else {
            next - tick()
        };
        buckets.push(Bucket {
            label: label_for(cursor, granularity, range),
            start: cursor,
            boundary,
        });
        cursor = next;
    }
    buckets
}

fn label_for(ts: NaiveDateTime, granularity: Granularity, range: TimeRange) -> String {
    match (granularity, range) {
        (Granularity::Weekly, _) => ts.format("%b %-d").to_string(),
        (Granularity::Monthly, TimeRange::AllTime) => ts.format("%b %Y").to_string(),
        (Granularity::Monthly, _) => ts.format("%b").to_string(),
    }
}

/// Effective interval of every bucket: the first starts at the window
/// start, each later one right after the previous boundary.
pub fn spans(window: &ResolvedWindow, buckets: &[Bucket]) -> Vec<Span> {
    let mut lower = window.start;
    buckets
        .iter()
        .map(|b| {
            let span = Span::between(lower, b.boundary);
            lower = b.boundary + tick();
            span
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn resolve(range: TimeRange, y: i32, m: u32, d: u32) -> ResolvedWindow {
        let now = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        range.resolve(now, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
    }

    fn assert_covers(window: &ResolvedWindow, buckets: &[Bucket]) {
        assert!(!buckets.is_empty());
        assert_eq!(buckets[0].start, window.start);
        assert_eq!(buckets.last().unwrap().boundary, window.end);
        for pair in buckets.windows(2) {
            assert!(pair[0].boundary < pair[1].boundary);
            assert_eq!(pair[0].boundary + tick(), pair[1].start);
        }
    }

    #[test]
    fn test_this_month_is_weekly() {
        let w = resolve(TimeRange::ThisMonth, 2024, 2, 10);
        let buckets = plan(&w, TimeRange::ThisMonth);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Feb 1", "Feb 8", "Feb 15", "Feb 22", "Feb 29"]);
        for pair in buckets.windows(2) {
            assert_eq!(pair[1].start - pair[0].start, Duration::days(7));
        }
        assert_covers(&w, &buckets);
    }

    #[test]
    fn test_last_month_keeps_stepped_label_on_clamped_bucket() {
        let w = resolve(TimeRange::LastMonth, 2025, 4, 10);
        let buckets = plan(&w, TimeRange::LastMonth);
        assert_eq!(buckets.len(), 5);
        let last = buckets.last().unwrap();
        // Steps past month end are clamped, the label is still the stepped date.
        assert_eq!(last.label, "Mar 29");
        assert_eq!(last.boundary, w.end);
        assert_covers(&w, &buckets);
    }

    #[test]
    fn test_this_year_is_twelve_months() {
        let w = resolve(TimeRange::ThisYear, 2025, 6, 1);
        let buckets = plan(&w, TimeRange::ThisYear);
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].label, "Jan");
        assert_eq!(buckets[11].label, "Dec");
        assert!(buckets[11].boundary >= w.end);
        assert_covers(&w, &buckets);
    }

    #[test]
    fn test_quarter_is_three_months() {
        let w = resolve(TimeRange::LastQuarter, 2025, 2, 1);
        let buckets = plan(&w, TimeRange::LastQuarter);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Oct", "Nov", "Dec"]);
        assert_covers(&w, &buckets);
    }

    #[test]
    fn test_all_time_labels_carry_year() {
        let w = resolve(TimeRange::AllTime, 2021, 3, 15);
        let buckets = plan(&w, TimeRange::AllTime);
        assert_eq!(buckets.len(), 15);
        assert_eq!(buckets[0].label, "Jan 2020");
        assert_eq!(buckets[14].label, "Mar 2021");
        assert_covers(&w, &buckets);
    }

    #[test]
    fn test_monthly_steps_stay_anchored_to_window_start() {
        let now = NaiveDate::from_ymd_opt(2020, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let w = TimeRange::AllTime.resolve(now, NaiveDate::from_ymd_opt(2020, 1, 31).unwrap());
        let buckets = plan(&w, TimeRange::AllTime);

        let starts: Vec<String> = buckets
            .iter()
            .map(|b| b.start.format("%Y-%m-%d").to_string())
            .collect();
        // February clamps to the 29th, March returns to the 31st.
        assert_eq!(
            starts,
            ["2020-01-31", "2020-02-29", "2020-03-31", "2020-04-30", "2020-05-31"]
        );
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Jan 2020", "Feb 2020", "Mar 2020", "Apr 2020", "May 2020"]);
        assert_covers(&w, &buckets);
    }

    #[test]
    fn test_spans_follow_previous_boundary() {
        let w = resolve(TimeRange::ThisQuarter, 2025, 5, 1);
        let buckets = plan(&w, TimeRange::ThisQuarter);
        let spans = spans(&w, &buckets);
        assert_eq!(spans.len(), buckets.len());
        assert_eq!(spans[0].from, Some(w.start));
        for (i, span) in spans.iter().enumerate().skip(1) {
            assert_eq!(span.from, Some(buckets[i - 1].boundary + tick()));
            assert_eq!(span.to, buckets[i].boundary);
        }
    }
}
