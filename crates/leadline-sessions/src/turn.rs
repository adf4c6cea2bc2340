use crate::SessionError;
use rusqlite::{params, Connection, Row};
use serde::Serialize;

/// One audited exchange within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub id: i64,
    pub session_id: i64,
    /// Starts at 1 and increases by one per turn.
    pub turn_number: i64,
    pub inbound_text: Option<String>,
    pub outbound_text: Option<String>,
    pub fields_saved: Vec<String>,
    /// Slot state after the turn.
    pub state_snapshot_json: String,
    pub created_at: String,
}

/// Parameters for appending a turn.
#[derive(Debug, Clone, Default)]
pub struct NewTurn<'a> {
    pub inbound_text: Option<&'a str>,
    pub outbound_text: Option<&'a str>,
    pub fields_saved: &'a [String],
    pub state_snapshot_json: &'a str,
}

/// Appends a turn and returns its turn number.
///
/// The number is assigned inside the insert, so concurrent writers cannot
/// observe the same maximum; `UNIQUE(session_id, turn_number)` backs it.
pub fn log_turn(
    conn: &Connection,
    session_id: i64,
    turn: &NewTurn<'_>,
) -> Result<i64, SessionError> {
    let fields_json = serde_json::to_string(turn.fields_saved)?;

    let turn_number: i64 = conn.query_row(
        "INSERT INTO turns
            (session_id, turn_number, inbound_text, outbound_text, fields_saved_json, state_snapshot_json)
         VALUES (
            ?1,
            (SELECT COALESCE(MAX(turn_number), 0) + 1 FROM turns WHERE session_id = ?1),
            ?2, ?3, ?4, ?5
         )
         RETURNING turn_number",
        params![
            session_id,
            turn.inbound_text,
            turn.outbound_text,
            fields_json,
            turn.state_snapshot_json,
        ],
        |row| row.get(0),
    )?;

    tracing::debug!(session_id, turn_number, "logged turn");
    Ok(turn_number)
}

fn map_row_to_turn(row: &Row) -> rusqlite::Result<(Turn, String)> {
    Ok((
        Turn {
            id: row.get(0)?,
            session_id: row.get(1)?,
            turn_number: row.get(2)?,
            inbound_text: row.get(3)?,
            outbound_text: row.get(4)?,
            fields_saved: Vec::new(),
            state_snapshot_json: row.get(6)?,
            created_at: row.get(7)?,
        },
        row.get(5)?,
    ))
}

/// Lists a session's turns in order.
pub fn list_turns(conn: &Connection, session_id: i64) -> Result<Vec<Turn>, SessionError> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, turn_number, inbound_text, outbound_text,
                fields_saved_json, state_snapshot_json, created_at
         FROM turns WHERE session_id = ?1
         ORDER BY turn_number ASC",
    )?;
    let rows = stmt.query_map([session_id], map_row_to_turn)?;

    let mut turns = Vec::new();
    for row in rows {
        let (mut turn, fields_json) = row?;
        turn.fields_saved = serde_json::from_str(&fields_json)?;
        turns.push(turn);
    }
    Ok(turns)
}
