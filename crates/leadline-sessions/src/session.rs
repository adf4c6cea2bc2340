use crate::SessionError;
use leadline_types::{Channel, SessionStatus};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::Serialize;

/// A stored conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: i64,
    pub channel: Channel,
    /// Phone number for text sessions, call id (or a placeholder) for calls.
    pub session_key: String,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    /// Serialized slot-filling state.
    pub state_json: String,
    pub status: SessionStatus,
    pub last_prompt_field: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub closed_at: Option<String>,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

const SESSION_COLUMNS: &str = "id, channel, session_key, from_number, to_number, state_json,
    status, last_prompt_field, created_at, updated_at, closed_at";

fn parse_label<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_row_to_session(row: &Row) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        channel: parse_label(row, 1)?,
        session_key: row.get(2)?,
        from_number: row.get(3)?,
        to_number: row.get(4)?,
        state_json: row.get(5)?,
        status: parse_label(row, 6)?,
        last_prompt_field: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        closed_at: row.get(10)?,
    })
}

/// Returns the open session for `(channel, key)`, creating it if needed.
///
/// Two racing first contacts for the same key both end up with the same
/// row: the insert is ignored when the open-key index already holds one.
/// A closed session is never returned.
pub fn get_or_create_open_session(
    conn: &Connection,
    channel: Channel,
    session_key: &str,
    from_number: Option<&str>,
    to_number: Option<&str>,
) -> Result<Session, SessionError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO sessions (channel, session_key, from_number, to_number)
         VALUES (?1, ?2, ?3, ?4)",
        params![channel.as_str(), session_key, from_number, to_number],
    )?;

    let session = conn.query_row(
        &format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE channel = ?1 AND session_key = ?2 AND status = 'open'"
        ),
        params![channel.as_str(), session_key],
        map_row_to_session,
    )?;

    if inserted > 0 {
        tracing::info!(
            session_id = session.id,
            channel = channel.as_str(),
            session_key,
            "created session"
        );
    }
    Ok(session)
}

/// Retrieves a session by id.
pub fn get_session(conn: &Connection, id: i64) -> Result<Session, SessionError> {
    conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
        [id],
        map_row_to_session,
    )
    .optional()?
    .ok_or(SessionError::NotFound(id))
}

/// Distinguishes "no such row" from "row is closed" after a guarded update hit nothing.
fn closed_or_missing(conn: &Connection, id: i64) -> SessionError {
    match get_session(conn, id) {
        Ok(_) => SessionError::Closed(id),
        Err(e) => e,
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

/// Replaces a placeholder key with the real one on the same row.
pub fn rekey_session(conn: &Connection, id: i64, new_key: &str) -> Result<Session, SessionError> {
    let updated = conn
        .execute(
            "UPDATE sessions SET session_key = ?2, updated_at = datetime('now')
             WHERE id = ?1 AND status = 'open'",
            params![id, new_key],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                SessionError::KeyInUse(new_key.to_string())
            } else {
                SessionError::Database(e)
            }
        })?;
    if updated == 0 {
        return Err(closed_or_missing(conn, id));
    }
    tracing::debug!(session_id = id, session_key = new_key, "re-keyed session");
    get_session(conn, id)
}

/// Records the caller and called numbers once they are known.
pub fn set_caller(
    conn: &Connection,
    id: i64,
    from_number: Option<&str>,
    to_number: Option<&str>,
) -> Result<(), SessionError> {
    let updated = conn.execute(
        "UPDATE sessions
         SET from_number = COALESCE(?2, from_number),
             to_number = COALESCE(?3, to_number),
             updated_at = datetime('now')
         WHERE id = ?1 AND status = 'open'",
        params![id, from_number, to_number],
    )?;
    if updated == 0 {
        return Err(closed_or_missing(conn, id));
    }
    Ok(())
}

/// Persists the slot state of an open session.
pub fn save_state(
    conn: &Connection,
    id: i64,
    state_json: &str,
    last_prompt_field: Option<&str>,
) -> Result<(), SessionError> {
    let updated = conn.execute(
        "UPDATE sessions
         SET state_json = ?2, last_prompt_field = ?3, updated_at = datetime('now')
         WHERE id = ?1 AND status = 'open'",
        params![id, state_json, last_prompt_field],
    )?;
    if updated == 0 {
        return Err(closed_or_missing(conn, id));
    }
    Ok(())
}

/// Closes an open session. A second close fails with [`SessionError::Closed`].
pub fn close_session(conn: &Connection, id: i64) -> Result<(), SessionError> {
    let updated = conn.execute(
        "UPDATE sessions
         SET status = 'closed', closed_at = datetime('now'), updated_at = datetime('now')
         WHERE id = ?1 AND status = 'open'",
        [id],
    )?;
    if updated == 0 {
        return Err(closed_or_missing(conn, id));
    }
    tracing::info!(session_id = id, "closed session");
    Ok(())
}

/// Lists open sessions, oldest first, optionally only those idle since
/// before `updated_before` (a SQLite timestamp).
pub fn list_open_sessions(
    conn: &Connection,
    channel: Option<Channel>,
    updated_before: Option<&str>,
) -> Result<Vec<Session>, SessionError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions
         WHERE status = 'open'
           AND (?1 IS NULL OR channel = ?1)
           AND (?2 IS NULL OR updated_at < ?2)
         ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(
        params![channel.map(Channel::as_str), updated_before],
        map_row_to_session,
    )?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(row?);
    }
    Ok(sessions)
}
