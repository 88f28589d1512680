pub mod config;
pub mod date_util;
pub mod error;
pub mod metrics;
pub mod period;
pub mod storage;

use std::sync::Arc;

use chrono::{Local, NaiveDateTime, Utc};

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use metrics::estimation::{EstimationPolicy, FixedEstimates, PlaceholderGrowth};
pub use metrics::{
    AnalyticsReport, DonationAnalytics, EventAnalytics, MemberAnalytics, OverviewAnalytics,
    ProgramAnalytics, Scope,
};
pub use period::{ResolvedWindow, TimeRange};
pub use storage::Database;

use storage::repository;

/// Main entry point for the analytics engine.
pub struct AnalyticsEngine {
    db: Database,
    config: EngineConfig,
    estimates: Arc<dyn EstimationPolicy>,
}

impl AnalyticsEngine {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let estimates = Arc::new(config.estimates.clone());
        Self {
            db,
            config,
            estimates,
        }
    }

    /// Open an engine configured from the database's own `app_config`.
    pub async fn from_database(db: Database) -> Result<Self> {
        let config = EngineConfig::load(&db).await?;
        Ok(Self::new(db, config))
    }

    /// Replace the modeled figures with another policy.
    pub fn with_estimation_policy(mut self, estimates: Arc<dyn EstimationPolicy>) -> Self {
        self.estimates = estimates;
        self
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve `range` against `now` once; every calculator shares the result.
    pub fn scope(&self, range: TimeRange, now: NaiveDateTime) -> Scope {
        Scope {
            range,
            window: range.resolve(now, self.config.service_epoch),
            currency: self.config.currency.clone(),
            estimates: self.estimates.clone(),
        }
    }

    // ── Reports ────────────────────────────────────────────────────

    /// Full report for a range token at the current local time. Unknown
    /// tokens fall back to `last_year`.
    pub async fn compute_all(&self, token: &str) -> Result<AnalyticsReport> {
        self.compute_all_at(TimeRange::parse(token), Local::now().naive_local())
            .await
    }

    /// Full report with an injected clock. Fails as a whole on the first
    /// calculator error.
    pub async fn compute_all_at(
        &self,
        range: TimeRange,
        now: NaiveDateTime,
    ) -> Result<AnalyticsReport> {
        let scope = self.scope(range, now);
        let (overview, members, donations, events, programs) = tokio::try_join!(
            metrics::compute_overview(&self.db, &scope),
            metrics::compute_member_analytics(&self.db, &scope),
            metrics::compute_donation_analytics(&self.db, &scope),
            metrics::compute_event_analytics(&self.db, &scope),
            metrics::compute_program_analytics(&self.db, &scope),
        )?;

        log::info!(
            "Report for {} ({} .. {}): {} members, {} events",
            range,
            scope.window.start,
            scope.window.end,
            members.summary.total_members,
            events.summary.total_events
        );

        Ok(AnalyticsReport {
            range,
            window: scope.window,
            overview,
            members,
            donations,
            events,
            programs,
            generated_at: Utc::now(),
        })
    }

    pub async fn overview(&self, range: TimeRange, now: NaiveDateTime) -> Result<OverviewAnalytics> {
        metrics::compute_overview(&self.db, &self.scope(range, now)).await
    }

    pub async fn members(&self, range: TimeRange, now: NaiveDateTime) -> Result<MemberAnalytics> {
        metrics::compute_member_analytics(&self.db, &self.scope(range, now)).await
    }

    pub async fn donations(
        &self,
        range: TimeRange,
        now: NaiveDateTime,
    ) -> Result<DonationAnalytics> {
        metrics::compute_donation_analytics(&self.db, &self.scope(range, now)).await
    }

    pub async fn events(&self, range: TimeRange, now: NaiveDateTime) -> Result<EventAnalytics> {
        metrics::compute_event_analytics(&self.db, &self.scope(range, now)).await
    }

    pub async fn programs(&self, range: TimeRange, now: NaiveDateTime) -> Result<ProgramAnalytics> {
        metrics::compute_program_analytics(&self.db, &self.scope(range, now)).await
    }

    // ── Data & config commands ─────────────────────────────────────

    /// Import a dataset in one transaction.
    pub async fn load(&self, data: repository::Dataset) -> Result<repository::LoadReport> {
        let report = self
            .db
            .writer()
            .call(move |conn| repository::load_dataset(conn, &data))
            .await?;
        log::info!("Loaded {} records", report.total());
        Ok(report)
    }

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .reader()
            .call({
                let key = key.to_string();
                move |conn| repository::get_config(conn, &key)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .writer()
            .call({
                let key = key.to_string();
                let value = value.to_string();
                move |conn| repository::set_config(conn, &key, &value)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DistributionSlice;
    use crate::storage::repository::*;
    use chrono::NaiveDate;

    fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    async fn engine() -> AnalyticsEngine {
        let db = Database::open_memory().await.unwrap();
        AnalyticsEngine::new(db, EngineConfig::default())
    }

    /// Every modeled figure is zero or a single flat value.
    struct NoEstimates;

    impl EstimationPolicy for NoEstimates {
        fn volunteer_hours(&self, _: u64, _: NaiveDateTime, _: NaiveDateTime) -> u64 {
            0
        }
        fn program_participation(&self, total: u64) -> Vec<DistributionSlice> {
            vec![DistributionSlice::new("All Programs", total)]
        }
        fn corporate_threshold(&self) -> f64 {
            f64::INFINITY
        }
        fn donation_sources(&self, individual: u64, _: u64) -> Vec<DistributionSlice> {
            vec![DistributionSlice::new("Individual Donors", individual)]
        }
        fn placeholder_growth(&self) -> PlaceholderGrowth {
            PlaceholderGrowth {
                volunteer_hours: 0,
                volunteer_retention: 0,
                program_participation: 0,
                partner_engagement: 0,
            }
        }
    }

    #[tokio::test]
    async fn test_empty_report_has_every_section() {
        let engine = engine().await;
        let report = engine
            .compute_all_at(TimeRange::ThisMonth, noon(2025, 2, 10))
            .await
            .unwrap();

        assert_eq!(report.range, TimeRange::ThisMonth);
        assert_eq!(report.window.label, "This Month");
        assert_eq!(report.overview.key_metrics.len(), 4);
        assert_eq!(report.members.summary.total_members, 0);
        assert_eq!(report.donations.summary.total_raised, 0.0);
        assert_eq!(report.events.summary.attendance_rate, 0);
        assert_eq!(report.programs.summary.volunteer_hours, 0);
        // February 2025 has four weekly buckets.
        assert_eq!(report.members.growth.len(), 4);
    }

    #[tokio::test]
    async fn test_data_source_failure_fails_whole_report() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| conn.execute_batch("DROP TABLE event_registrations"))
            .await
            .unwrap();
        let engine = AnalyticsEngine::new(db, EngineConfig::default());

        let result = engine
            .compute_all_at(TimeRange::ThisYear, noon(2025, 6, 1))
            .await;
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[tokio::test]
    async fn test_unknown_token_falls_back_to_last_year() {
        let engine = engine().await;
        let report = engine.compute_all("fortnight").await.unwrap();
        assert_eq!(report.range, TimeRange::LastYear);
        assert_eq!(report.members.growth.len(), 12);
    }

    #[tokio::test]
    async fn test_report_serializes_camel_case() {
        let engine = engine().await;
        let report = engine
            .compute_all_at(TimeRange::AllTime, noon(2021, 3, 15))
            .await
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["range"], "all_time");
        assert!(json["generatedAt"].as_str().unwrap().contains('T'));
        assert!(json["members"]["summary"]["retentionRate"].is_number());
        assert!(json["members"]["joinTrends"][0]["growthRate"].is_string());
        assert!(json["members"]["joinTrends"][0]["new"].is_number());
        assert!(json["overview"]["keyMetrics"].is_array());
        assert_eq!(json["members"]["growth"][0]["label"], "Jan 2020");
    }

    #[tokio::test]
    async fn test_config_drives_scope() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                set_config(conn, "service_epoch", "2024-01-01")?;
                set_config(conn, "currency", "USD")
            })
            .await
            .unwrap();
        let engine = AnalyticsEngine::from_database(db).await.unwrap();

        let scope = engine.scope(TimeRange::AllTime, noon(2024, 3, 5));
        assert_eq!(scope.window.start, noon(2024, 1, 1) - chrono::Duration::hours(12));
        assert_eq!(scope.currency, "USD");
    }

    #[tokio::test]
    async fn test_swapped_estimation_policy() {
        let engine = engine().await.with_estimation_policy(Arc::new(NoEstimates));
        engine
            .db()
            .writer()
            .call(|conn| {
                insert_volunteer(
                    conn,
                    &VolunteerRecord {
                        id: "v1".to_string(),
                        name: "V".to_string(),
                        email: None,
                        status: "active".to_string(),
                        created_at: noon(2025, 1, 2),
                    },
                )
            })
            .await
            .unwrap();

        let programs = engine
            .programs(TimeRange::ThisYear, noon(2025, 6, 1))
            .await
            .unwrap();
        assert_eq!(programs.summary.volunteer_hours, 0);
        assert_eq!(programs.summary.engagement_growth, 0);
        assert_eq!(
            programs.program_participation,
            vec![DistributionSlice::new("All Programs", 1)]
        );

        let overview = engine
            .overview(TimeRange::ThisYear, noon(2025, 6, 1))
            .await
            .unwrap();
        assert_eq!(overview.key_metrics[3].growth, 0);
    }

    #[tokio::test]
    async fn test_load_and_config_commands() {
        let engine = engine().await;
        let data: Dataset = serde_json::from_str(
            r#"{
                "members": [{
                    "id": "m1", "name": "Amina", "status": "active",
                    "member_type": "individual", "join_date": "2025-01-10",
                    "created_at": "2025-01-10T08:30:00"
                }],
                "donations": [{
                    "id": "d1", "amount": 2500, "payment_method": "mpesa",
                    "status": "completed", "created_at": "2025-01-11 09:00:00"
                }]
            }"#,
        )
        .unwrap();
        let loaded = engine.load(data).await.unwrap();
        assert_eq!(loaded.members, 1);
        assert_eq!(loaded.donations, 1);

        let members = engine
            .members(TimeRange::ThisMonth, noon(2025, 1, 20))
            .await
            .unwrap();
        assert_eq!(members.summary.new_members, 1);

        engine.config_set("currency", "TZS").await.unwrap();
        assert_eq!(engine.config_get("currency").await.unwrap().as_deref(), Some("TZS"));
        assert_eq!(engine.config_get("missing").await.unwrap(), None);
        assert_eq!(engine.config_list().await.unwrap().len(), 1);
    }
}
