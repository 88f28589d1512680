//! Read-only aggregation primitives over the record tables.
//!
//! Every query is "a predicate over one time column plus optional
//! categorical filters" answered as a count, a sum, or a grouped count.
//! Table and column names are compile-time constants; values are always
//! bound parameters.

use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::date_util::to_key;
use crate::period::Span;

#[derive(Debug, Clone)]
enum Filter {
    Eq(&'static str, String),
    NotNull(&'static str),
    /// Half-open numeric band `[min, max)`; `None` leaves that side open.
    Band(&'static str, Option<f64>, Option<f64>),
}

/// Selection of rows from one source (a table or a fixed join).
#[derive(Debug, Clone)]
pub struct Criteria {
    source: &'static str,
    time_column: &'static str,
    span: Span,
    filters: Vec<Filter>,
}

impl Criteria {
    pub fn new(source: &'static str, time_column: &'static str, span: Span) -> Self {
        Self {
            source,
            time_column,
            span,
            filters: Vec::new(),
        }
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Eq(column, value.into()));
        self
    }

    pub fn not_null(mut self, column: &'static str) -> Self {
        self.filters.push(Filter::NotNull(column));
        self
    }

    pub fn band(mut self, column: &'static str, min: Option<f64>, max: Option<f64>) -> Self {
        self.filters.push(Filter::Band(column, min, max));
        self
    }

    /// Same filters, different time span.
    pub fn with_span(&self, span: Span) -> Self {
        Self {
            span,
            ..self.clone()
        }
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(from) = self.span.from {
            clauses.push(format!("{} >= ?", self.time_column));
            params.push(Value::Text(to_key(from)));
        }
        clauses.push(format!("{} <= ?", self.time_column));
        params.push(Value::Text(to_key(self.span.to)));

        for filter in &self.filters {
            match filter {
                Filter::Eq(col, val) => {
                    clauses.push(format!("{col} = ?"));
                    params.push(Value::Text(val.clone()));
                }
                Filter::NotNull(col) => clauses.push(format!("{col} IS NOT NULL")),
                Filter::Band(col, min, max) => {
                    if let Some(min) = min {
                        clauses.push(format!("{col} >= ?"));
                        params.push(Value::Real(*min));
                    }
                    if let Some(max) = max {
                        clauses.push(format!("{col} < ?"));
                        params.push(Value::Real(*max));
                    }
                }
            }
        }

        (clauses.join(" AND "), params)
    }
}

/// Ordering of a grouped count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOrder {
    /// Group key order as SQLite produces it.
    Natural,
    /// Descending count, at most `n` groups.
    TopByCount(usize),
}

pub fn count(conn: &Connection, criteria: &Criteria) -> Result<u64, rusqlite::Error> {
    let (where_sql, params) = criteria.where_clause();
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {where_sql}", criteria.source);
    let n: i64 = conn.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
    Ok(n as u64)
}

pub fn count_distinct(
    conn: &Connection,
    criteria: &Criteria,
    column: &'static str,
) -> Result<u64, rusqlite::Error> {
    let (where_sql, params) = criteria.where_clause();
    let sql = format!(
        "SELECT COUNT(DISTINCT {column}) FROM {} WHERE {where_sql}",
        criteria.source
    );
    let n: i64 = conn.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
    Ok(n as u64)
}

pub fn sum(
    conn: &Connection,
    criteria: &Criteria,
    column: &'static str,
) -> Result<f64, rusqlite::Error> {
    let (where_sql, params) = criteria.where_clause();
    let sql = format!(
        "SELECT COALESCE(SUM({column}), 0.0) FROM {} WHERE {where_sql}",
        criteria.source
    );
    conn.query_row(&sql, params_from_iter(params), |row| row.get(0))
}

/// Mean number of days between `column` and `reference` over the selected
/// rows, `None` when no rows match.
pub fn average_days_before(
    conn: &Connection,
    criteria: &Criteria,
    column: &'static str,
    reference: NaiveDateTime,
) -> Result<Option<f64>, rusqlite::Error> {
    let (where_sql, where_params) = criteria.where_clause();
    let sql = format!(
        "SELECT AVG(julianday(?) - julianday({column})) FROM {} WHERE {where_sql}",
        criteria.source
    );
    let mut params = vec![Value::Text(to_key(reference))];
    params.extend(where_params);
    conn.query_row(&sql, params_from_iter(params), |row| row.get(0))
}

/// Count rows per distinct value of `column`. A NULL value is its own group.
pub fn group_count(
    conn: &Connection,
    criteria: &Criteria,
    column: &'static str,
    order: GroupOrder,
) -> Result<Vec<(Option<String>, u64)>, rusqlite::Error> {
    let (where_sql, params) = criteria.where_clause();
    let tail = match order {
        GroupOrder::Natural => String::new(),
        GroupOrder::TopByCount(n) => format!(" ORDER BY COUNT(*) DESC, {column} LIMIT {n}"),
    };
    let sql = format!(
        "SELECT {column}, COUNT(*) FROM {} WHERE {where_sql} GROUP BY {column}{tail}",
        criteria.source
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), |row| {
        Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)? as u64))
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_util::parse_timestamp;
    use crate::storage::repository::{insert_donation, insert_member, DonationRecord, MemberRecord};
    use crate::storage::Database;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    fn member(id: &str, status: &str, county: Option<&str>, created: &str) -> MemberRecord {
        MemberRecord {
            id: id.to_string(),
            name: format!("Member {id}"),
            email: None,
            status: status.to_string(),
            member_type: "individual".to_string(),
            county: county.map(str::to_string),
            join_date: ts(created),
            created_at: ts(created),
        }
    }

    #[tokio::test]
    async fn test_count_respects_inclusive_span_and_filters() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                insert_member(conn, &member("m1", "active", None, "2025-01-01"))?;
                insert_member(conn, &member("m2", "inactive", None, "2025-01-31 23:59:59"))?;
                insert_member(conn, &member("m3", "active", None, "2025-02-01"))?;

                let jan = Span::between(ts("2025-01-01"), ts("2025-01-31 23:59:59"));
                let all = Criteria::new("members", "created_at", jan);
                assert_eq!(count(conn, &all)?, 2);
                assert_eq!(count(conn, &all.clone().eq("status", "active"))?, 1);

                let until = all.with_span(Span::until(ts("2025-02-01")));
                assert_eq!(count(conn, &until)?, 3);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_group_count_top_by_count() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                let rows = [
                    ("m1", Some("Nairobi")),
                    ("m2", Some("Nairobi")),
                    ("m3", Some("Kisumu")),
                    ("m4", None),
                    ("m5", Some("Mombasa")),
                    ("m6", Some("Mombasa")),
                    ("m7", Some("Mombasa")),
                ];
                for (id, county) in rows {
                    insert_member(conn, &member(id, "active", county, "2025-01-10"))?;
                }

                let c = Criteria::new("members", "created_at", Span::until(ts("2025-12-31")))
                    .not_null("county");
                let groups = group_count(conn, &c, "county", GroupOrder::TopByCount(2))?;
                assert_eq!(
                    groups,
                    vec![
                        (Some("Mombasa".to_string()), 3),
                        (Some("Nairobi".to_string()), 2)
                    ]
                );

                let c = c.with_span(Span::until(ts("2025-12-31")));
                let all = group_count(conn, &c, "county", GroupOrder::Natural)?;
                assert_eq!(all.len(), 3);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sum_band_and_distinct() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                let gifts = [
                    ("d1", Some("a@x.org"), 500.0),
                    ("d2", Some("a@x.org"), 1000.0),
                    ("d3", Some("b@x.org"), 4999.0),
                    ("d4", None, 20000.0),
                ];
                for (id, email, amount) in gifts {
                    insert_donation(
                        conn,
                        &DonationRecord {
                            id: id.to_string(),
                            donor_name: None,
                            donor_email: email.map(str::to_string),
                            amount,
                            payment_method: "mpesa".to_string(),
                            status: "completed".to_string(),
                            created_at: ts("2025-03-01"),
                        },
                    )?;
                }

                let c = Criteria::new("donations", "created_at", Span::until(ts("2025-12-31")));
                assert_eq!(sum(conn, &c, "amount")?, 26499.0);
                assert_eq!(count_distinct(conn, &c, "donor_email")?, 2);
                assert_eq!(count(conn, &c.clone().band("amount", Some(1000.0), Some(5000.0)))?, 2);
                assert_eq!(count(conn, &c.clone().band("amount", Some(10000.0), None))?, 1);

                let empty = c.with_span(Span::until(ts("2024-01-01")));
                assert_eq!(sum(conn, &empty, "amount")?, 0.0);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_average_days_before() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                insert_member(conn, &member("m1", "active", None, "2025-01-01"))?;
                insert_member(conn, &member("m2", "active", None, "2025-01-11"))?;

                let c = Criteria::new("members", "join_date", Span::until(ts("2025-01-21")));
                let avg = average_days_before(conn, &c, "join_date", ts("2025-01-21"))?;
                assert_eq!(avg.map(|d| d.round()), Some(15.0));

                let none = c.with_span(Span::until(ts("2024-01-01")));
                assert_eq!(average_days_before(conn, &none, "join_date", ts("2025-01-21"))?, None);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }
}
