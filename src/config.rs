use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::metrics::estimation::FixedEstimates;
use crate::storage::{repository, Database};

/// Keys read from `app_config`.
pub const KEYS: [&str; 5] = [
    "service_epoch",
    "currency",
    "volunteer_hours_per_month",
    "grants_share_pct",
    "fundraising_events_share_pct",
];

/// Engine settings. Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Start of tracked history; anchors the `all_time` window.
    pub service_epoch: NaiveDate,
    pub currency: String,
    pub estimates: FixedEstimates,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            service_epoch: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            currency: "KES".to_string(),
            estimates: FixedEstimates::default(),
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a whole number, got '{value}'")))
}

impl EngineConfig {
    /// Build from `(key, value)` pairs; unknown keys are ignored.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut config = Self::default();
        for (key, value) in pairs {
            match key {
                "service_epoch" => {
                    config.service_epoch = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                        .map_err(|_| {
                            Error::Config(format!(
                                "service_epoch must be YYYY-MM-DD, got '{value}'"
                            ))
                        })?;
                }
                "currency" => {
                    let code = value.trim();
                    if code.is_empty() {
                        return Err(Error::Config("currency must not be empty".into()));
                    }
                    config.currency = code.to_string();
                }
                "volunteer_hours_per_month" => {
                    config.estimates.hours_per_volunteer_per_month = parse_number(key, value)?;
                }
                "grants_share_pct" => {
                    config.estimates.grants_share_pct = parse_number(key, value)?;
                }
                "fundraising_events_share_pct" => {
                    config.estimates.fundraising_events_share_pct = parse_number(key, value)?;
                }
                _ => {}
            }
        }
        Ok(config)
    }

    /// Read the settings stored in the database.
    pub async fn load(db: &Database) -> Result<Self> {
        let pairs = db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await?;
        log::debug!("Loaded {} config entries", pairs.len());
        Self::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}
