use super::types::*;
use super::{
    compute_donation_analytics, compute_event_analytics, compute_member_analytics,
    compute_program_analytics, growth_percent, Scope,
};
use crate::error::Result;
use crate::period::Span;
use crate::storage::aggregate::{self, Criteria};
use crate::storage::Database;

fn members_created(span: Span) -> Criteria {
    Criteria::new("members", "created_at", span)
}

fn completed_donations(span: Span) -> Criteria {
    Criteria::new("donations", "created_at", span).eq("status", "completed")
}

fn events_starting(span: Span) -> Criteria {
    Criteria::new("events", "start_date", span)
}

/// Growth of the three headline figures, queried straight from the raw
/// window and comparison-window values. Members compare sign-ups, not
/// running totals, so this can differ from the member summary.
pub async fn cross_domain_growth(db: &Database, scope: &Scope) -> Result<CrossDomainGrowth> {
    let window = scope.window.clone();
    let previous = window.previous();

    let growth = db
        .reader()
        .call(move |conn| {
            let members = growth_percent(
                aggregate::count(conn, &members_created(window.span()))? as f64,
                aggregate::count(conn, &members_created(previous.span()))? as f64,
            );
            let donations = growth_percent(
                aggregate::sum(conn, &completed_donations(window.span()), "amount")?,
                aggregate::sum(conn, &completed_donations(previous.span()), "amount")?,
            );
            let events = growth_percent(
                aggregate::count(conn, &events_starting(window.span()))? as f64,
                aggregate::count(conn, &events_starting(previous.span()))? as f64,
            );
            Ok::<CrossDomainGrowth, rusqlite::Error>(CrossDomainGrowth {
                members,
                donations,
                events,
            })
        })
        .await?;

    Ok(growth)
}

/// `"KES 2.5M"`
fn format_millions(currency: &str, amount: f64) -> String {
    format!("{currency} {:.1}M", amount / 1_000_000.0)
}

fn key_metrics(
    scope: &Scope,
    growth: &CrossDomainGrowth,
    members: &MemberAnalytics,
    donations: &DonationAnalytics,
    events: &EventAnalytics,
    programs: &ProgramAnalytics,
) -> Vec<KeyMetric> {
    let tile = |id: &str, title: &str, value: String, growth: i64| KeyMetric {
        id: id.to_string(),
        title: title.to_string(),
        value,
        growth,
    };
    vec![
        tile(
            "members",
            "Total Members",
            members.summary.total_members.to_string(),
            growth.members,
        ),
        tile(
            "donations",
            "Total Donations",
            format_millions(&scope.currency, donations.summary.total_raised),
            growth.donations,
        ),
        tile(
            "events",
            "Events Held",
            events.summary.total_events.to_string(),
            growth.events,
        ),
        tile(
            "volunteers",
            "Volunteer Hours",
            programs.summary.volunteer_hours.to_string(),
            scope.estimates.placeholder_growth().volunteer_hours,
        ),
    ]
}

/// Cross-domain digest: headline tiles plus a few series borrowed from
/// the four calculators.
pub async fn compute_overview(db: &Database, scope: &Scope) -> Result<OverviewAnalytics> {
    log::debug!("Overview for {}", scope.range);

    let (members, donations, events, programs, growth) = tokio::try_join!(
        compute_member_analytics(db, scope),
        compute_donation_analytics(db, scope),
        compute_event_analytics(db, scope),
        compute_program_analytics(db, scope),
        cross_domain_growth(db, scope),
    )?;

    let key_metrics = key_metrics(scope, &growth, &members, &donations, &events, &programs);

    Ok(OverviewAnalytics {
        key_metrics,
        growth,
        member_growth: members.growth,
        donation_trends: donations.monthly_trends,
        attendance_trends: events.attendance_trends,
        program_participation: programs.program_participation,
    })
}
