use super::types::*;
use super::{growth_percent, title_case, to_slices, Scope};
use crate::error::Result;
use crate::period::{plan, spans, Span};
use crate::storage::aggregate::{self, Criteria, GroupOrder};
use crate::storage::Database;

fn volunteers(span: Span) -> Criteria {
    Criteria::new("volunteers", "created_at", span)
}

fn active_partners(span: Span) -> Criteria {
    Criteria::new("partners", "created_at", span).eq("status", "active")
}

/// Compute volunteer and partner analytics for the scope's window.
///
/// Hours and the program split come from the scope's estimation policy;
/// head counts come from the volunteer and partner tables.
pub async fn compute_program_analytics(db: &Database, scope: &Scope) -> Result<ProgramAnalytics> {
    let window = scope.window.clone();
    let previous = window.previous();
    let buckets = plan(&window, scope.range);
    let bucket_spans = spans(&window, &buckets);
    let estimates = scope.estimates.clone();
    log::debug!(
        "Program analytics for {} ({} .. {})",
        scope.range,
        window.start,
        window.end
    );

    let analytics = db
        .reader()
        .call(move |conn| {
            let active = aggregate::count(conn, &volunteers(window.as_of_end()).eq("status", "active"))?;
            let total = aggregate::count(conn, &volunteers(window.as_of_end()))?;
            let new_volunteers = aggregate::count(conn, &volunteers(window.span()))?;
            let partners = aggregate::count(conn, &active_partners(window.as_of_end()))?;

            let prev_active =
                aggregate::count(conn, &volunteers(previous.as_of_end()).eq("status", "active"))?;
            let prev_partners = aggregate::count(conn, &active_partners(previous.as_of_end()))?;

            let hours = estimates.volunteer_hours(active, window.start, window.end);
            let prev_hours = estimates.volunteer_hours(prev_active, previous.start, previous.end);
            let placeholder = estimates.placeholder_growth();

            let summary = ProgramSummary {
                active_volunteers: active,
                total_volunteers: total,
                new_volunteers,
                volunteer_hours: hours,
                active_partners: partners,
                volunteer_growth: growth_percent(active as f64, prev_active as f64),
                hours_growth: growth_percent(hours as f64, prev_hours as f64),
                partner_growth: growth_percent(partners as f64, prev_partners as f64),
                retention_growth: placeholder.volunteer_retention,
                participation_growth: placeholder.program_participation,
                engagement_growth: placeholder.partner_engagement,
            };

            let joined = volunteers(window.span());
            let mut volunteer_trends = Vec::with_capacity(buckets.len());
            for (bucket, span) in buckets.iter().zip(&bucket_spans) {
                volunteer_trends.push(VolunteerTrend {
                    label: bucket.label.clone(),
                    new_volunteers: aggregate::count(conn, &joined.with_span(*span))?,
                    total: aggregate::count(conn, &joined.with_span(Span::until(bucket.boundary)))?,
                });
            }

            let partner_types = to_slices(
                aggregate::group_count(
                    conn,
                    &active_partners(window.as_of_end()),
                    "partner_type",
                    GroupOrder::Natural,
                )?,
                title_case,
                None,
            );

            Ok::<ProgramAnalytics, rusqlite::Error>(ProgramAnalytics {
                summary,
                volunteer_trends,
                partner_types,
                program_participation: estimates.program_participation(total),
            })
        })
        .await?;

    Ok(analytics)
}
