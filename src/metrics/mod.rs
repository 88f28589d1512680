pub mod donations;
pub mod estimation;
pub mod events;
pub mod members;
pub mod overview;
pub mod programs;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

use std::sync::Arc;

pub use types::*;

use crate::period::{ResolvedWindow, TimeRange};
use estimation::EstimationPolicy;

pub use donations::compute_donation_analytics;
pub use events::compute_event_analytics;
pub use members::compute_member_analytics;
pub use overview::compute_overview;
pub use programs::compute_program_analytics;

/// Everything a calculator needs for one request. The window is resolved
/// once by the caller and shared by every calculator.
#[derive(Clone)]
pub struct Scope {
    pub range: TimeRange,
    pub window: ResolvedWindow,
    pub currency: String,
    pub estimates: Arc<dyn EstimationPolicy>,
}

// ── Shared arithmetic ──────────────────────────────────────────────

/// Round half up (towards positive infinity), so -2.5 becomes -2.
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Round to one decimal place.
pub fn round1(x: f64) -> f64 {
    round_half_up(x * 10.0) / 10.0
}

/// Period-over-period growth as a whole percentage.
///
/// With a zero baseline there is nothing to compare against: any current
/// value reports 100, nothing at all reports 0. A drop to zero from a
/// positive baseline is -100.
pub fn growth_percent(current: f64, previous: f64) -> i64 {
    if previous > 0.0 {
        round_half_up((current - previous) / previous * 100.0) as i64
    } else if current > 0.0 {
        100
    } else {
        0
    }
}

/// `part / whole` as a whole percentage, 0 for an empty whole.
pub fn percent_of(part: u64, whole: u64) -> i64 {
    if whole == 0 {
        0
    } else {
        round_half_up(part as f64 / whole as f64 * 100.0) as i64
    }
}

/// `num / den`, 0 for a zero denominator.
pub fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// `part / whole` formatted as `"12.3%"`, or `"0%"` for an empty whole.
pub fn percent_string(part: u64, whole: u64) -> String {
    if whole == 0 {
        "0%".to_string()
    } else {
        format!("{:.1}%", part as f64 / whole as f64 * 100.0)
    }
}

// ── Labels ─────────────────────────────────────────────────────────

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `"life_member"` becomes `"Life Member"`.
pub fn title_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"mobile_money"` becomes `"Mobile-Money"`.
pub fn payment_method_label(s: &str) -> String {
    s.split('_')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("-")
}

/// Turn grouped counts into slices. NULL groups take `null_label` (or are
/// dropped when it is `None`); groups that end up with the same name merge.
pub fn to_slices(
    groups: Vec<(Option<String>, u64)>,
    label: impl Fn(&str) -> String,
    null_label: Option<&str>,
) -> Vec<DistributionSlice> {
    let mut slices: Vec<DistributionSlice> = Vec::new();
    for (key, count) in groups {
        let name = match (key, null_label) {
            (Some(k), _) => label(&k),
            (None, Some(fallback)) => fallback.to_string(),
            (None, None) => continue,
        };
        match slices.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.value += count,
            None => slices.push(DistributionSlice::new(name, count)),
        }
    }
    slices
}
