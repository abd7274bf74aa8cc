use std::str::FromStr;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

use super::TIMESTAMP_FORMAT;
use crate::models::{Booking, BookingStatus, Profile, Role};

const BOOKING_COLUMNS: &str = "id, service_id, service_name, customer_name, customer_email, \
     customer_phone, booking_date, guests, total_cost, special_requirements, payment_intent_id, \
     status, user_id, created_at, updated_at";

const PROFILE_COLUMNS: &str = "user_id, email, full_name, role, created_at, updated_at";

pub(crate) fn now_timestamp() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(value: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .with_context(|| format!("invalid timestamp in store: {value}"))
}

fn search_pattern(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("%{}%", t.to_lowercase()))
}

fn where_clause(clauses: &[String]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

// ── Bookings ──

#[derive(Debug, Clone)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub search: Option<String>,
    pub limit: i64,
}

impl Default for BookingFilter {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            limit: 100,
        }
    }
}

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            booking.id,
            booking.service_id,
            booking.service_name,
            booking.customer_name,
            booking.customer_email,
            booking.customer_phone,
            booking.booking_date.format("%Y-%m-%d").to_string(),
            booking.guests,
            booking.total_cost.to_string(),
            booking.special_requirements,
            booking.payment_intent_id,
            booking.status.as_str(),
            booking.user_id,
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_intent(conn: &Connection, intent_id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE payment_intent_id = ?1"),
        params![intent_id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_timestamp(), id],
    )?;
    Ok(count > 0)
}

/// Single-statement status write keyed by payment intent. Repeating it
/// with the same status is a no-op apart from `updated_at`.
pub fn update_status_by_intent(
    conn: &Connection,
    intent_id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE payment_intent_id = ?3",
        params![status.as_str(), now_timestamp(), intent_id],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<Vec<Booking>> {
    let mut clauses: Vec<String> = vec![];
    let mut values: Vec<Box<dyn ToSql>> = vec![];

    if let Some(status) = filter.status {
        values.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", values.len()));
    }
    if let Some(pattern) = search_pattern(filter.search.as_deref()) {
        values.push(Box::new(pattern));
        let n = values.len();
        clauses.push(format!(
            "(LOWER(customer_name) LIKE ?{n} OR LOWER(customer_email) LIKE ?{n} OR LOWER(service_name) LIKE ?{n})"
        ));
    }
    values.push(Box::new(filter.limit));

    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings{} ORDER BY created_at DESC, id ASC LIMIT ?{}",
        where_clause(&clauses),
        values.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BookingStats {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    pub confirmed_revenue: Decimal,
    pub pending_revenue: Decimal,
}

pub fn booking_stats(conn: &Connection) -> anyhow::Result<BookingStats> {
    let mut stmt = conn.prepare("SELECT status, total_cost FROM bookings")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut stats = BookingStats::default();
    for row in rows {
        let (status, total_cost) = row?;
        let total_cost = Decimal::from_str(&total_cost)
            .with_context(|| format!("invalid total_cost in store: {total_cost}"))?;
        stats.total += 1;
        match BookingStatus::parse(&status) {
            Some(BookingStatus::Pending) => {
                stats.pending += 1;
                stats.pending_revenue += total_cost;
            }
            Some(BookingStatus::Confirmed) => {
                stats.confirmed += 1;
                stats.confirmed_revenue += total_cost;
            }
            Some(BookingStatus::Cancelled) => stats.cancelled += 1,
            None => tracing::warn!(status = %status, "unknown booking status in store"),
        }
    }
    Ok(stats)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let booking_date_str: String = row.get(6)?;
    let total_cost_str: String = row.get(8)?;
    let status_str: String = row.get(11)?;
    let created_at_str: String = row.get(13)?;
    let updated_at_str: String = row.get(14)?;

    let booking_date = NaiveDate::parse_from_str(&booking_date_str, "%Y-%m-%d")
        .with_context(|| format!("invalid booking_date in store: {booking_date_str}"))?;
    let total_cost = Decimal::from_str(&total_cost_str)
        .with_context(|| format!("invalid total_cost in store: {total_cost_str}"))?;
    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("unknown booking status in store: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        service_id: row.get(1)?,
        service_name: row.get(2)?,
        customer_name: row.get(3)?,
        customer_email: row.get(4)?,
        customer_phone: row.get(5)?,
        booking_date,
        guests: row.get(7)?,
        total_cost,
        special_requirements: row.get(9)?,
        payment_intent_id: row.get(10)?,
        status,
        user_id: row.get(12)?,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

// ── Profiles ──

#[derive(Debug, Clone)]
pub struct ProfileFilter {
    pub role: Option<Role>,
    pub search: Option<String>,
    pub limit: i64,
}

impl Default for ProfileFilter {
    fn default() -> Self {
        Self {
            role: None,
            search: None,
            limit: 100,
        }
    }
}

pub fn get_profile(conn: &Connection, user_id: &str) -> anyhow::Result<Option<Profile>> {
    let result = conn.query_row(
        &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
        params![user_id],
        |row| Ok(parse_profile_row(row)),
    );

    match result {
        Ok(profile) => Ok(Some(profile?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Provision a `user` profile for a newly seen identity. Existing rows,
/// and their role, are left untouched.
pub fn ensure_profile(
    conn: &Connection,
    user_id: &str,
    email: &str,
    full_name: Option<&str>,
) -> anyhow::Result<()> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO profiles (user_id, email, full_name, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'user', ?4, ?4)
         ON CONFLICT(user_id) DO NOTHING",
        params![user_id, email, full_name, now],
    )?;
    Ok(())
}

pub fn upsert_admin_profile(
    conn: &Connection,
    user_id: &str,
    email: &str,
    full_name: &str,
) -> anyhow::Result<()> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO profiles (user_id, email, full_name, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'admin', ?4, ?4)
         ON CONFLICT(user_id) DO UPDATE SET role = 'admin', updated_at = excluded.updated_at",
        params![user_id, email, full_name, now],
    )?;
    Ok(())
}

pub fn set_role(conn: &Connection, user_id: &str, role: Role) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE profiles SET role = ?1, updated_at = ?2 WHERE user_id = ?3",
        params![role.as_str(), now_timestamp(), user_id],
    )?;
    Ok(count > 0)
}

pub fn count_profiles_with_role(conn: &Connection, role: Role) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM profiles WHERE role = ?1",
        params![role.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn list_profiles(conn: &Connection, filter: &ProfileFilter) -> anyhow::Result<Vec<Profile>> {
    let mut clauses: Vec<String> = vec![];
    let mut values: Vec<Box<dyn ToSql>> = vec![];

    if let Some(role) = filter.role {
        values.push(Box::new(role.as_str()));
        clauses.push(format!("role = ?{}", values.len()));
    }
    if let Some(pattern) = search_pattern(filter.search.as_deref()) {
        values.push(Box::new(pattern));
        let n = values.len();
        clauses.push(format!(
            "(LOWER(email) LIKE ?{n} OR LOWER(COALESCE(full_name, '')) LIKE ?{n})"
        ));
    }
    values.push(Box::new(filter.limit));

    let sql = format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles{} ORDER BY created_at DESC, user_id ASC LIMIT ?{}",
        where_clause(&clauses),
        values.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_profile_row(row)))?;

    let mut profiles = vec![];
    for row in rows {
        profiles.push(row??);
    }
    Ok(profiles)
}

fn parse_profile_row(row: &rusqlite::Row) -> anyhow::Result<Profile> {
    let role_str: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;
    let updated_at_str: String = row.get(5)?;

    let role = Role::parse(&role_str).with_context(|| format!("unknown role in store: {role_str}"))?;

    Ok(Profile {
        user_id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

// ── Audit Log ──

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub actor_id: String,
    pub action: String,
    pub target_id: String,
    pub detail: Option<String>,
    pub created_at: String,
}

pub fn record_audit(
    conn: &Connection,
    actor_id: &str,
    action: &str,
    target_id: &str,
    detail: Option<&str>,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO audit_log (actor_id, action, target_id, detail, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![actor_id, action, target_id, detail, now_timestamp()],
    )?;
    Ok(())
}

pub fn list_audit(conn: &Connection, limit: i64) -> anyhow::Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, actor_id, action, target_id, detail, created_at
         FROM audit_log ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(AuditEntry {
            id: row.get(0)?,
            actor_id: row.get(1)?,
            action: row.get(2)?,
            target_id: row.get(3)?,
            detail: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}
