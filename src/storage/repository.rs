use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Deserializer, Serialize};

use crate::date_util::{parse_timestamp, to_key};

fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
    let s = String::deserialize(d)?;
    parse_timestamp(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}")))
}

// ── Records ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct MemberRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub status: String,
    pub member_type: String,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub join_date: NaiveDateTime,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DonationRecord {
    pub id: String,
    #[serde(default)]
    pub donor_name: Option<String>,
    #[serde(default)]
    pub donor_email: Option<String>,
    pub amount: f64,
    pub payment_method: String,
    pub status: String,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub start_date: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRecord {
    pub id: String,
    pub event_id: String,
    pub status: String,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolunteerRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub status: String,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartnerRecord {
    pub id: String,
    pub name: String,
    pub partner_type: String,
    pub status: String,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: NaiveDateTime,
}

/// A bulk import file: every record kind the engine reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub members: Vec<MemberRecord>,
    pub donations: Vec<DonationRecord>,
    pub events: Vec<EventRecord>,
    pub registrations: Vec<RegistrationRecord>,
    pub volunteers: Vec<VolunteerRecord>,
    pub partners: Vec<PartnerRecord>,
}

/// Row counts written by [`load_dataset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub members: usize,
    pub donations: usize,
    pub events: usize,
    pub registrations: usize,
    pub volunteers: usize,
    pub partners: usize,
}

impl LoadReport {
    pub fn total(&self) -> usize {
        self.members
            + self.donations
            + self.events
            + self.registrations
            + self.volunteers
            + self.partners
    }
}

// ── Writers ────────────────────────────────────────────────────────

pub fn insert_member(conn: &Connection, m: &MemberRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO members (
            member_id, name, email, status, member_type, county, join_date, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            m.id,
            m.name,
            m.email,
            m.status,
            m.member_type,
            m.county,
            to_key(m.join_date),
            to_key(m.created_at),
        ],
    )?;
    Ok(())
}

pub fn insert_donation(conn: &Connection, d: &DonationRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO donations (
            donation_id, donor_name, donor_email, amount, payment_method, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            d.id,
            d.donor_name,
            d.donor_email,
            d.amount,
            d.payment_method,
            d.status,
            to_key(d.created_at),
        ],
    )?;
    Ok(())
}

pub fn insert_event(conn: &Connection, e: &EventRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO events (event_id, title, category, start_date)
         VALUES (?1, ?2, ?3, ?4)",
        params![e.id, e.title, e.category, to_key(e.start_date)],
    )?;
    Ok(())
}

pub fn insert_registration(
    conn: &Connection,
    r: &RegistrationRecord,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO event_registrations (registration_id, event_id, status, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![r.id, r.event_id, r.status, to_key(r.created_at)],
    )?;
    Ok(())
}

pub fn insert_volunteer(conn: &Connection, v: &VolunteerRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO volunteers (volunteer_id, name, email, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![v.id, v.name, v.email, v.status, to_key(v.created_at)],
    )?;
    Ok(())
}

pub fn insert_partner(conn: &Connection, p: &PartnerRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO partners (partner_id, name, partner_type, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![p.id, p.name, p.partner_type, p.status, to_key(p.created_at)],
    )?;
    Ok(())
}

/// Insert a whole dataset in one transaction. Events are written before
/// registrations so the foreign key holds.
pub fn load_dataset(conn: &mut Connection, data: &Dataset) -> Result<LoadReport, rusqlite::Error> {
    let tx = conn.transaction()?;
    for m in &data.members {
        insert_member(&tx, m)?;
    }
    for d in &data.donations {
        insert_donation(&tx, d)?;
    }
    for e in &data.events {
        insert_event(&tx, e)?;
    }
    for r in &data.registrations {
        insert_registration(&tx, r)?;
    }
    for v in &data.volunteers {
        insert_volunteer(&tx, v)?;
    }
    for p in &data.partners {
        insert_partner(&tx, p)?;
    }
    tx.commit()?;

    Ok(LoadReport {
        members: data.members.len(),
        donations: data.donations.len(),
        events: data.events.len(),
        registrations: data.registrations.len(),
        volunteers: data.volunteers.len(),
        partners: data.partners.len(),
    })
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}
