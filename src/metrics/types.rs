use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::period::{ResolvedWindow, TimeRange};

/// One category of a group-by breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSlice {
    pub name: String,
    pub value: u64,
}

impl DistributionSlice {
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A single labelled value of a trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub label: String,
    pub value: u64,
}

// ── Members ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    /// Members created on or before the window end.
    pub total_members: u64,
    /// Active members who joined on or before the window end.
    pub active_members: u64,
    /// Members created inside the window.
    pub new_members: u64,
    /// `active / total` as a whole percentage, 0 when there are no members.
    pub retention_rate: i64,
    /// Mean tenure of active members in years, one decimal.
    pub avg_tenure_years: f64,
    pub total_growth: i64,
    pub active_growth: i64,
    pub new_members_growth: i64,
    pub retention_growth: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTrend {
    pub label: String,
    #[serde(rename = "new")]
    pub new_members: u64,
    pub total: u64,
    /// New members relative to the total at bucket start, e.g. `"12.5%"`.
    pub growth_rate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAnalytics {
    pub summary: MemberSummary,
    /// Running membership total as of each bucket boundary.
    pub growth: Vec<TrendPoint>,
    pub join_trends: Vec<JoinTrend>,
    pub status_distribution: Vec<DistributionSlice>,
    pub type_distribution: Vec<DistributionSlice>,
    pub county_distribution: Vec<DistributionSlice>,
}

// ── Donations ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationSummary {
    pub total_raised: f64,
    pub donation_count: u64,
    /// Distinct donor emails among completed donations.
    pub total_donors: u64,
    pub avg_donation: i64,
    /// Donors with more than one completed donation in the window.
    pub recurring_donors: u64,
    pub raised_growth: i64,
    pub donors_growth: i64,
    pub avg_donation_growth: i64,
    pub recurring_growth: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonationTrend {
    pub label: String,
    pub amount: f64,
    pub donors: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationAnalytics {
    pub summary: DonationSummary,
    pub monthly_trends: Vec<DonationTrend>,
    pub payment_methods: Vec<DistributionSlice>,
    pub amount_ranges: Vec<DistributionSlice>,
    /// Modeled split, see [`crate::metrics::estimation::EstimationPolicy`].
    pub sources: Vec<DistributionSlice>,
}

// ── Events ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub total_events: u64,
    /// Registrations marked attended for events starting in the window.
    pub total_attendance: u64,
    pub total_registrations: u64,
    pub avg_attendance: i64,
    pub attendance_rate: i64,
    pub events_growth: i64,
    pub attendance_growth: i64,
    pub avg_attendance_growth: i64,
    pub attendance_rate_growth: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationPoint {
    pub label: String,
    pub registrations: u64,
    pub attendance: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendancePoint {
    pub label: String,
    pub rate: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAnalytics {
    pub summary: EventSummary,
    pub registration_vs_attendance: Vec<RegistrationPoint>,
    pub event_types: Vec<DistributionSlice>,
    pub attendance_trends: Vec<AttendancePoint>,
}

// ── Programs ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSummary {
    pub active_volunteers: u64,
    pub total_volunteers: u64,
    pub new_volunteers: u64,
    /// Estimated, not tracked.
    pub volunteer_hours: u64,
    pub active_partners: u64,
    pub volunteer_growth: i64,
    pub hours_growth: i64,
    pub partner_growth: i64,
    pub retention_growth: i64,
    pub participation_growth: i64,
    pub engagement_growth: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolunteerTrend {
    pub label: String,
    #[serde(rename = "new")]
    pub new_volunteers: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramAnalytics {
    pub summary: ProgramSummary,
    pub volunteer_trends: Vec<VolunteerTrend>,
    pub partner_types: Vec<DistributionSlice>,
    /// Modeled split, see [`crate::metrics::estimation::EstimationPolicy`].
    pub program_participation: Vec<DistributionSlice>,
}

// ── Overview ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMetric {
    pub id: String,
    pub title: String,
    pub value: String,
    pub growth: i64,
}

/// Period-over-period growth recomputed by the overview from raw
/// comparison-window figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrossDomainGrowth {
    pub members: i64,
    pub donations: i64,
    pub events: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewAnalytics {
    pub key_metrics: Vec<KeyMetric>,
    pub growth: CrossDomainGrowth,
    pub member_growth: Vec<TrendPoint>,
    pub donation_trends: Vec<DonationTrend>,
    pub attendance_trends: Vec<AttendancePoint>,
    pub program_participation: Vec<DistributionSlice>,
}

// ── Combined ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub range: TimeRange,
    pub window: ResolvedWindow,
    pub overview: OverviewAnalytics,
    pub members: MemberAnalytics,
    pub donations: DonationAnalytics,
    pub events: EventAnalytics,
    pub programs: ProgramAnalytics,
    pub generated_at: DateTime<Utc>,
}
