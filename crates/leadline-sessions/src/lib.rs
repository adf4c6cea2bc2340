//! Session and turn persistence.
//!
//! A session is the durable record of one lead-collection conversation,
//! identified by `(channel, session_key)`. At most one session per key is
//! open at a time (a partial unique index enforces it), closed sessions are
//! never reopened, and every conversational exchange is appended to the
//! `turns` audit table with a gap-free turn number.
//!
//! All functions take a plain `&Connection`; async callers run them on a
//! blocking thread.

mod session;
mod turn;

pub use session::{
    close_session, get_or_create_open_session, get_session, list_open_sessions, rekey_session,
    save_state, set_caller, Session,
};
pub use turn::{list_turns, log_turn, NewTurn, Turn};

use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session not found: {0}")]
    NotFound(i64),
    #[error("session {0} is already closed")]
    Closed(i64),
    #[error("another open session already uses key {0}")]
    KeyInUse(String),
}
