//! Succeeded, failed, and rejected lead ledgers.
//!
//! Each closed session owns exactly one ledger row; the `UNIQUE(session_id)`
//! constraints on the three tables make a second insert fail.

use crate::filter::LedgerFilter;
use leadline_db::sqlite_timestamp;
use leadline_types::{Channel, LeadFields, RejectionCategory};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SucceededLead {
    pub id: i64,
    pub session_id: i64,
    pub channel: Channel,
    pub lead: LeadFields,
    pub record_id: String,
    pub submitted_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLead {
    pub id: i64,
    pub session_id: i64,
    pub channel: Channel,
    pub lead: LeadFields,
    /// First error plus one appended paragraph per failed retry.
    pub error: String,
    pub retry_count: i64,
    pub resolved: bool,
    pub last_retry_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedLead {
    pub id: i64,
    pub session_id: i64,
    pub channel: Channel,
    pub lead: LeadFields,
    pub reason: String,
    pub category: RejectionCategory,
    pub rejected_at: String,
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn channel_at(row: &Row, idx: usize) -> rusqlite::Result<Channel> {
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, e))
}

fn lead_at(row: &Row, idx: usize) -> rusqlite::Result<LeadFields> {
    let json: String = row.get(idx)?;
    serde_json::from_str(&json).map_err(|e| conversion_error(idx, e))
}

fn lead_json(lead: &LeadFields) -> rusqlite::Result<String> {
    serde_json::to_string(lead).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn map_row_to_succeeded(row: &Row) -> rusqlite::Result<SucceededLead> {
    Ok(SucceededLead {
        id: row.get(0)?,
        session_id: row.get(1)?,
        channel: channel_at(row, 2)?,
        lead: lead_at(row, 3)?,
        record_id: row.get(4)?,
        submitted_at: row.get(5)?,
    })
}

fn map_row_to_failed(row: &Row) -> rusqlite::Result<FailedLead> {
    Ok(FailedLead {
        id: row.get(0)?,
        session_id: row.get(1)?,
        channel: channel_at(row, 2)?,
        lead: lead_at(row, 3)?,
        error: row.get(4)?,
        retry_count: row.get(5)?,
        resolved: row.get(6)?,
        last_retry_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_row_to_rejected(row: &Row) -> rusqlite::Result<RejectedLead> {
    let category: String = row.get(5)?;
    Ok(RejectedLead {
        id: row.get(0)?,
        session_id: row.get(1)?,
        channel: channel_at(row, 2)?,
        lead: lead_at(row, 3)?,
        reason: row.get(4)?,
        category: category.parse().map_err(|e| conversion_error(5, e))?,
        rejected_at: row.get(6)?,
    })
}

pub fn insert_succeeded(
    conn: &Connection,
    session_id: i64,
    channel: Channel,
    lead: &LeadFields,
    record_id: &str,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "INSERT INTO succeeded_leads (session_id, channel, lead_json, record_id)
         VALUES (?1, ?2, ?3, ?4) RETURNING id",
        params![session_id, channel.as_str(), lead_json(lead)?, record_id],
        |row| row.get(0),
    )
}

pub fn insert_failed(
    conn: &Connection,
    session_id: i64,
    channel: Channel,
    lead: &LeadFields,
    error: &str,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "INSERT INTO failed_leads (session_id, channel, lead_json, error)
         VALUES (?1, ?2, ?3, ?4) RETURNING id",
        params![session_id, channel.as_str(), lead_json(lead)?, error],
        |row| row.get(0),
    )
}

pub fn insert_rejected(
    conn: &Connection,
    session_id: i64,
    channel: Channel,
    lead: &LeadFields,
    reason: &str,
    category: RejectionCategory,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "INSERT INTO rejected_leads (session_id, channel, lead_json, reason, category)
         VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id",
        params![
            session_id,
            channel.as_str(),
            lead_json(lead)?,
            reason,
            category.as_str()
        ],
        |row| row.get(0),
    )
}

const FAILED_COLUMNS: &str =
    "id, session_id, channel, lead_json, error, retry_count, resolved, last_retry_at, created_at";

pub fn get_failed(conn: &Connection, id: i64) -> rusqlite::Result<Option<FailedLead>> {
    conn.query_row(
        &format!("SELECT {FAILED_COLUMNS} FROM failed_leads WHERE id = ?1"),
        [id],
        map_row_to_failed,
    )
    .optional()
}

/// Lists failed leads, oldest first.
pub fn list_failed(conn: &Connection, include_resolved: bool) -> rusqlite::Result<Vec<FailedLead>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FAILED_COLUMNS} FROM failed_leads
         WHERE ?1 OR resolved = 0
         ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map([include_resolved], map_row_to_failed)?;
    rows.collect()
}

/// Marks a failed lead resolved after a successful retry.
pub fn mark_retry_succeeded(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE failed_leads
         SET resolved = 1, retry_count = retry_count + 1, last_retry_at = datetime('now')
         WHERE id = ?1 AND resolved = 0",
        [id],
    )
}

/// Records another failed retry, appending the error to the history.
pub fn mark_retry_failed(conn: &Connection, id: i64, error: &str) -> rusqlite::Result<i64> {
    let stamp = sqlite_timestamp(chrono::Utc::now());
    conn.query_row(
        "UPDATE failed_leads
         SET retry_count = retry_count + 1,
             last_retry_at = ?3,
             error = error || char(10) || char(10) || 'Retry ' || (retry_count + 1) || ' at ' || ?3 || ': ' || ?2
         WHERE id = ?1 AND resolved = 0
         RETURNING retry_count",
        params![id, error, stamp],
        |row| row.get(0),
    )
}

/// Builds `WHERE` clauses shared by the rejected and succeeded listings.
fn filter_clauses(
    filter: &LedgerFilter,
    time_column: &str,
    with_category: bool,
) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
    let mut clauses = vec!["1 = 1".to_string()];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(since) = filter.since {
        values.push(Box::new(sqlite_timestamp(since)));
        clauses.push(format!("{time_column} >= ?{}", values.len()));
    }
    if let Some(channel) = filter.channel {
        values.push(Box::new(channel.as_str()));
        clauses.push(format!("channel = ?{}", values.len()));
    }
    if with_category {
        if let Some(category) = filter.category {
            values.push(Box::new(category.as_str()));
            clauses.push(format!("category = ?{}", values.len()));
        }
    }
    (clauses.join(" AND "), values)
}

/// Lists rejected leads, newest first.
pub fn list_rejected(
    conn: &Connection,
    filter: &LedgerFilter,
) -> rusqlite::Result<Vec<RejectedLead>> {
    let (where_clause, values) = filter_clauses(filter, "rejected_at", true);
    let sql = format!(
        "SELECT id, session_id, channel, lead_json, reason, category, rejected_at
         FROM rejected_leads WHERE {where_clause}
         ORDER BY rejected_at DESC, id DESC"
    );
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| &**p).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_refs.as_slice(), map_row_to_rejected)?;
    rows.collect()
}

/// Lists succeeded leads, newest first.
pub fn list_succeeded(
    conn: &Connection,
    filter: &LedgerFilter,
) -> rusqlite::Result<Vec<SucceededLead>> {
    let (where_clause, values) = filter_clauses(filter, "submitted_at", false);
    let sql = format!(
        "SELECT id, session_id, channel, lead_json, record_id, submitted_at
         FROM succeeded_leads WHERE {where_clause}
         ORDER BY submitted_at DESC, id DESC"
    );
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| &**p).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_refs.as_slice(), map_row_to_succeeded)?;
    rows.collect()
}

/// Number of ledger rows across all three tables that reference a session.
pub fn ledger_entries_for_session(conn: &Connection, session_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM succeeded_leads WHERE session_id = ?1)
          + (SELECT COUNT(*) FROM failed_leads WHERE session_id = ?1 AND resolved = 0)
          + (SELECT COUNT(*) FROM rejected_leads WHERE session_id = ?1)",
        [session_id],
        |row| row.get(0),
    )
}
