//! Fixtures shared by the calculator tests.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use super::estimation::FixedEstimates;
use super::Scope;
use crate::date_util::parse_timestamp;
use crate::period::TimeRange;
use crate::storage::Database;

pub fn ts(s: &str) -> NaiveDateTime {
    parse_timestamp(s).unwrap()
}

pub fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

/// Resolve `range` at noon on `today`.
pub fn scope(range: TimeRange, today: &str) -> Scope {
    let now = ts(today) + chrono::Duration::hours(12);
    Scope {
        range,
        window: range.resolve(now, epoch()),
        currency: "KES".to_string(),
        estimates: Arc::new(FixedEstimates::default()),
    }
}

pub async fn seed<F>(db: &Database, f: F)
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<(), rusqlite::Error> + Send + 'static,
{
    db.writer().call(f).await.unwrap();
}
