use super::types::*;
use super::{growth_percent, percent_of, percent_string, round1, title_case, to_slices, Scope};
use crate::date_util::tick;
use crate::error::Result;
use crate::period::{plan, spans, Span};
use crate::storage::aggregate::{self, Criteria, GroupOrder};
use crate::storage::Database;

const DAYS_PER_YEAR: f64 = 365.25;
const TOP_COUNTIES: usize = 10;

fn created(span: Span) -> Criteria {
    Criteria::new("members", "created_at", span)
}

fn active(span: Span) -> Criteria {
    Criteria::new("members", "join_date", span).eq("status", "active")
}

/// Retention capped to `[0, 100]`; join dates may precede creation dates.
fn retention_rate(active: u64, total: u64) -> i64 {
    percent_of(active, total).clamp(0, 100)
}

/// Compute membership analytics for the scope's window.
pub async fn compute_member_analytics(db: &Database, scope: &Scope) -> Result<MemberAnalytics> {
    let window = scope.window.clone();
    let previous = window.previous();
    let buckets = plan(&window, scope.range);
    let bucket_spans = spans(&window, &buckets);
    log::debug!(
        "Member analytics for {} ({} .. {}), {} buckets",
        scope.range,
        window.start,
        window.end,
        buckets.len()
    );

    let analytics = db
        .reader()
        .call(move |conn| {
            let total = aggregate::count(conn, &created(window.as_of_end()))?;
            let active_members = aggregate::count(conn, &active(window.as_of_end()))?;
            let new_members = aggregate::count(conn, &created(window.span()))?;

            let prev_total = aggregate::count(conn, &created(previous.as_of_end()))?;
            let prev_active = aggregate::count(conn, &active(previous.as_of_end()))?;
            let prev_new = aggregate::count(conn, &created(previous.span()))?;

            let retention = retention_rate(active_members, total);
            let prev_retention = retention_rate(prev_active, prev_total);

            let tenure_days = aggregate::average_days_before(
                conn,
                &active(window.as_of_end()),
                "join_date",
                window.end,
            )?;
            let avg_tenure_years = tenure_days
                .map(|days| round1(days / DAYS_PER_YEAR))
                .unwrap_or(0.0);

            let summary = MemberSummary {
                total_members: total,
                active_members,
                new_members,
                retention_rate: retention,
                avg_tenure_years,
                total_growth: growth_percent(total as f64, prev_total as f64),
                active_growth: growth_percent(active_members as f64, prev_active as f64),
                new_members_growth: growth_percent(new_members as f64, prev_new as f64),
                retention_growth: growth_percent(retention as f64, prev_retention as f64),
            };

            let mut growth = Vec::with_capacity(buckets.len());
            for bucket in &buckets {
                growth.push(TrendPoint {
                    label: bucket.label.clone(),
                    value: aggregate::count(conn, &created(Span::until(bucket.boundary)))?,
                });
            }

            let mut join_trends = Vec::with_capacity(buckets.len());
            for (bucket, span) in buckets.iter().zip(&bucket_spans) {
                let joined = aggregate::count(conn, &created(*span))?;
                let at_start = match span.from {
                    Some(from) => aggregate::count(conn, &created(Span::until(from - tick())))?,
                    None => 0,
                };
                join_trends.push(JoinTrend {
                    label: bucket.label.clone(),
                    new_members: joined,
                    total: at_start + joined,
                    growth_rate: percent_string(joined, at_start),
                });
            }

            let as_of_end = created(window.as_of_end());
            let status_distribution = to_slices(
                aggregate::group_count(conn, &as_of_end, "status", GroupOrder::Natural)?,
                title_case,
                None,
            );
            let type_distribution = to_slices(
                aggregate::group_count(conn, &as_of_end, "member_type", GroupOrder::Natural)?,
                title_case,
                None,
            );
            let county_distribution = to_slices(
                aggregate::group_count(
                    conn,
                    &as_of_end.clone().not_null("county"),
                    "county",
                    GroupOrder::TopByCount(TOP_COUNTIES),
                )?,
                str::to_string,
                None,
            );

            Ok::<MemberAnalytics, rusqlite::Error>(MemberAnalytics {
                summary,
                growth,
                join_trends,
                status_distribution,
                type_distribution,
                county_distribution,
            })
        })
        .await?;

    Ok(analytics)
}
