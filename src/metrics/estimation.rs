//! Modeled figures for data the CRM does not track yet.
//!
//! Volunteer hours, the program participation split, the donation source
//! split and a handful of growth tiles are approximations. They all live
//! behind [`EstimationPolicy`] so a tracked implementation can replace
//! them without touching the calculators.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::types::DistributionSlice;
use super::{percent_of, round_half_up};

/// Fixed growth percentages shown where no comparison data exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderGrowth {
    pub volunteer_hours: i64,
    pub volunteer_retention: i64,
    pub program_participation: i64,
    pub partner_engagement: i64,
}

impl Default for PlaceholderGrowth {
    fn default() -> Self {
        Self {
            volunteer_hours: 5,
            volunteer_retention: 2,
            program_participation: 3,
            partner_engagement: 25,
        }
    }
}

pub trait EstimationPolicy: Send + Sync {
    /// Hours contributed by `active_volunteers` over `[start, end]`.
    fn volunteer_hours(&self, active_volunteers: u64, start: NaiveDateTime, end: NaiveDateTime)
        -> u64;

    /// Split of `total_volunteers` across program categories.
    fn program_participation(&self, total_volunteers: u64) -> Vec<DistributionSlice>;

    /// Gift size at or above which a donation counts as corporate.
    fn corporate_threshold(&self) -> f64;

    /// Percentage split of donation sources given the individual and
    /// corporate donation counts.
    fn donation_sources(&self, individual: u64, corporate: u64) -> Vec<DistributionSlice>;

    fn placeholder_growth(&self) -> PlaceholderGrowth;
}

/// The constants the organization reports with today.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedEstimates {
    pub hours_per_volunteer_per_month: u64,
    /// Program name and its share of volunteers in percent.
    pub program_split: Vec<(String, u64)>,
    pub corporate_threshold: f64,
    pub grants_share_pct: u64,
    pub fundraising_events_share_pct: u64,
    pub growth: PlaceholderGrowth,
}

impl Default for FixedEstimates {
    fn default() -> Self {
        Self {
            hours_per_volunteer_per_month: 15,
            program_split: vec![
                ("Education".to_string(), 35),
                ("Health".to_string(), 25),
                ("Community Development".to_string(), 20),
                ("Environment".to_string(), 15),
                ("Other".to_string(), 5),
            ],
            corporate_threshold: 10_000.0,
            grants_share_pct: 15,
            fundraising_events_share_pct: 15,
            growth: PlaceholderGrowth::default(),
        }
    }
}

/// Whole 30-day months in a window, at least one.
pub fn months_in_window(start: NaiveDateTime, end: NaiveDateTime) -> u64 {
    let days = (end - start).num_milliseconds() as f64 / 86_400_000.0;
    (round_half_up(days / 30.0) as u64).max(1)
}

impl EstimationPolicy for FixedEstimates {
    fn volunteer_hours(
        &self,
        active_volunteers: u64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> u64 {
        active_volunteers * self.hours_per_volunteer_per_month * months_in_window(start, end)
    }

    fn program_participation(&self, total_volunteers: u64) -> Vec<DistributionSlice> {
        self.program_split
            .iter()
            .map(|(name, pct)| {
                let share = round_half_up(total_volunteers as f64 * *pct as f64 / 100.0);
                DistributionSlice::new(name.clone(), share as u64)
            })
            .collect()
    }

    fn corporate_threshold(&self) -> f64 {
        self.corporate_threshold
    }

    fn donation_sources(&self, individual: u64, corporate: u64) -> Vec<DistributionSlice> {
        let total = individual + corporate;
        vec![
            DistributionSlice::new("Individual Donors", percent_of(individual, total) as u64),
            DistributionSlice::new("Corporate Partners", percent_of(corporate, total) as u64),
            DistributionSlice::new("Grants", self.grants_share_pct),
            DistributionSlice::new("Fundraising Events", self.fundraising_events_share_pct),
        ]
    }

    fn placeholder_growth(&self) -> PlaceholderGrowth {
        self.growth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::TimeRange;
    use chrono::NaiveDate;

    fn window(range: TimeRange) -> (NaiveDateTime, NaiveDateTime) {
        let now = NaiveDate::from_ymd_opt(2025, 5, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let w = range.resolve(now, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        (w.start, w.end)
    }

    #[test]
    fn test_months_in_window() {
        let (s, e) = window(TimeRange::ThisMonth);
        assert_eq!(months_in_window(s, e), 1);
        let (s, e) = window(TimeRange::ThisQuarter);
        assert_eq!(months_in_window(s, e), 3);
        let (s, e) = window(TimeRange::LastYear);
        assert_eq!(months_in_window(s, e), 12);
        // Never zero, even for a degenerate window.
        assert_eq!(months_in_window(s, s), 1);
    }

    #[test]
    fn test_volunteer_hours() {
        let est = FixedEstimates::default();
        let (s, e) = window(TimeRange::ThisQuarter);
        assert_eq!(est.volunteer_hours(10, s, e), 10 * 15 * 3);
        assert_eq!(est.volunteer_hours(0, s, e), 0);
    }

    #[test]
    fn test_program_participation_split() {
        let est = FixedEstimates::default();
        let split = est.program_participation(200);
        let values: Vec<u64> = split.iter().map(|s| s.value).collect();
        assert_eq!(values, [70, 50, 40, 30, 10]);
        assert_eq!(split[0].name, "Education");

        assert!(est.program_participation(0).iter().all(|s| s.value == 0));
    }

    #[test]
    fn test_donation_sources() {
        let est = FixedEstimates::default();
        let sources = est.donation_sources(3, 1);
        let values: Vec<u64> = sources.iter().map(|s| s.value).collect();
        assert_eq!(values, [75, 25, 15, 15]);

        let empty = est.donation_sources(0, 0);
        assert_eq!(empty[0].value, 0);
        assert_eq!(empty[1].value, 0);
    }
}
