use super::types::*;
use super::{growth_percent, payment_method_label, ratio, round_half_up, to_slices, Scope};
use crate::error::Result;
use crate::period::{plan, spans, Span};
use crate::storage::aggregate::{self, Criteria, GroupOrder};
use crate::storage::Database;

/// Gift size histogram bands, `[min, max)`.
const AMOUNT_BANDS: [(&str, Option<f64>, Option<f64>); 5] = [
    ("0-1K", None, Some(1_000.0)),
    ("1K-5K", Some(1_000.0), Some(5_000.0)),
    ("5K-10K", Some(5_000.0), Some(10_000.0)),
    ("10K-50K", Some(10_000.0), Some(50_000.0)),
    ("50K+", Some(50_000.0), None),
];

fn completed(span: Span) -> Criteria {
    Criteria::new("donations", "created_at", span).eq("status", "completed")
}

/// Raw figures of one period, shared by the current and comparison windows.
struct PeriodTotals {
    raised: f64,
    count: u64,
    donors: u64,
    recurring: u64,
}

impl PeriodTotals {
    fn average(&self) -> f64 {
        ratio(self.raised, self.count as f64)
    }
}

fn period_totals(
    conn: &rusqlite::Connection,
    span: Span,
) -> std::result::Result<PeriodTotals, rusqlite::Error> {
    let c = completed(span);
    let with_donor = c.clone().not_null("donor_email");
    let recurring = aggregate::group_count(conn, &with_donor, "donor_email", GroupOrder::Natural)?
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .count() as u64;
    Ok(PeriodTotals {
        raised: aggregate::sum(conn, &c, "amount")?,
        count: aggregate::count(conn, &c)?,
        donors: aggregate::count_distinct(conn, &with_donor, "donor_email")?,
        recurring,
    })
}

/// Compute donation analytics for the scope's window. Only completed
/// donations are counted.
pub async fn compute_donation_analytics(
    db: &Database,
    scope: &Scope,
) -> Result<DonationAnalytics> {
    let window = scope.window.clone();
    let previous = window.previous();
    let buckets = plan(&window, scope.range);
    let bucket_spans = spans(&window, &buckets);
    let estimates = scope.estimates.clone();
    log::debug!(
        "Donation analytics for {} ({} .. {})",
        scope.range,
        window.start,
        window.end
    );

    let analytics = db
        .reader()
        .call(move |conn| {
            let current = period_totals(conn, window.span())?;
            let prior = period_totals(conn, previous.span())?;

            let summary = DonationSummary {
                total_raised: current.raised,
                donation_count: current.count,
                total_donors: current.donors,
                avg_donation: round_half_up(current.average()) as i64,
                recurring_donors: current.recurring,
                raised_growth: growth_percent(current.raised, prior.raised),
                donors_growth: growth_percent(current.donors as f64, prior.donors as f64),
                avg_donation_growth: growth_percent(current.average(), prior.average()),
                recurring_growth: growth_percent(current.recurring as f64, prior.recurring as f64),
            };

            let in_window = completed(window.span());

            let mut monthly_trends = Vec::with_capacity(buckets.len());
            for (bucket, span) in buckets.iter().zip(&bucket_spans) {
                let c = in_window.with_span(*span);
                monthly_trends.push(DonationTrend {
                    label: bucket.label.clone(),
                    amount: aggregate::sum(conn, &c, "amount")?,
                    donors: aggregate::count_distinct(conn, &c, "donor_email")?,
                });
            }

            let payment_methods = to_slices(
                aggregate::group_count(conn, &in_window, "payment_method", GroupOrder::Natural)?,
                payment_method_label,
                None,
            );

            let mut amount_ranges = Vec::with_capacity(AMOUNT_BANDS.len());
            for (name, min, max) in AMOUNT_BANDS {
                let n = aggregate::count(conn, &in_window.clone().band("amount", min, max))?;
                amount_ranges.push(DistributionSlice::new(name, n));
            }

            let threshold = estimates.corporate_threshold();
            let individual =
                aggregate::count(conn, &in_window.clone().band("amount", None, Some(threshold)))?;
            let corporate =
                aggregate::count(conn, &in_window.clone().band("amount", Some(threshold), None))?;
            let sources = estimates.donation_sources(individual, corporate);

            Ok::<DonationAnalytics, rusqlite::Error>(DonationAnalytics {
                summary,
                monthly_trends,
                payment_methods,
                amount_ranges,
                sources,
            })
        })
        .await?;

    Ok(analytics)
}
