use super::types::*;
use super::{growth_percent, percent_of, ratio, round_half_up, to_slices, Scope};
use crate::error::Result;
use crate::period::{plan, spans, Span};
use crate::storage::aggregate::{self, Criteria, GroupOrder};
use crate::storage::Database;

const REGISTRATIONS_BY_EVENT_START: &str =
    "event_registrations r JOIN events e ON e.event_id = r.event_id";

fn events_starting(span: Span) -> Criteria {
    Criteria::new("events", "start_date", span)
}

/// Registrations of events that start inside `span`.
fn registrations(span: Span) -> Criteria {
    Criteria::new(REGISTRATIONS_BY_EVENT_START, "e.start_date", span)
}

fn attended(span: Span) -> Criteria {
    registrations(span).eq("r.status", "attended")
}

struct PeriodTotals {
    events: u64,
    registrations: u64,
    attendance: u64,
}

impl PeriodTotals {
    fn attendance_per_event(&self) -> f64 {
        ratio(self.attendance as f64, self.events as f64)
    }

    fn attendance_rate(&self) -> i64 {
        percent_of(self.attendance, self.registrations)
    }
}

fn period_totals(
    conn: &rusqlite::Connection,
    span: Span,
) -> std::result::Result<PeriodTotals, rusqlite::Error> {
    Ok(PeriodTotals {
        events: aggregate::count(conn, &events_starting(span))?,
        registrations: aggregate::count(conn, &registrations(span))?,
        attendance: aggregate::count(conn, &attended(span))?,
    })
}

/// Compute event analytics for the scope's window. Events belong to the
/// window they start in, and so do their registrations.
pub async fn compute_event_analytics(db: &Database, scope: &Scope) -> Result<EventAnalytics> {
    let window = scope.window.clone();
    let previous = window.previous();
    let buckets = plan(&window, scope.range);
    let bucket_spans = spans(&window, &buckets);
    log::debug!(
        "Event analytics for {} ({} .. {})",
        scope.range,
        window.start,
        window.end
    );

    let analytics = db
        .reader()
        .call(move |conn| {
            let current = period_totals(conn, window.span())?;
            let prior = period_totals(conn, previous.span())?;

            let summary = EventSummary {
                total_events: current.events,
                total_attendance: current.attendance,
                total_registrations: current.registrations,
                avg_attendance: round_half_up(current.attendance_per_event()) as i64,
                attendance_rate: current.attendance_rate(),
                events_growth: growth_percent(current.events as f64, prior.events as f64),
                attendance_growth: growth_percent(
                    current.attendance as f64,
                    prior.attendance as f64,
                ),
                avg_attendance_growth: growth_percent(
                    current.attendance_per_event(),
                    prior.attendance_per_event(),
                ),
                attendance_rate_growth: growth_percent(
                    current.attendance_rate() as f64,
                    prior.attendance_rate() as f64,
                ),
            };

            let mut registration_vs_attendance = Vec::with_capacity(buckets.len());
            for (bucket, span) in buckets.iter().zip(&bucket_spans) {
                registration_vs_attendance.push(RegistrationPoint {
                    label: bucket.label.clone(),
                    registrations: aggregate::count(conn, &registrations(*span))?,
                    attendance: aggregate::count(conn, &attended(*span))?,
                });
            }

            let attendance_trends = registration_vs_attendance
                .iter()
                .map(|p| AttendancePoint {
                    label: p.label.clone(),
                    rate: percent_of(p.attendance, p.registrations),
                })
                .collect();

            let event_types = to_slices(
                aggregate::group_count(
                    conn,
                    &events_starting(window.span()),
                    "category",
                    GroupOrder::Natural,
                )?,
                str::to_string,
                Some("Other"),
            );

            Ok::<EventAnalytics, rusqlite::Error>(EventAnalytics {
                summary,
                registration_vs_attendance,
                event_types,
                attendance_trends,
            })
        })
        .await?;

    Ok(analytics)
}
