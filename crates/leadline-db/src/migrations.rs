//! Schema migrations embedded in the binary.
//!
//! Applied names are recorded in `_leadline_migrations`; a migration and its
//! record commit together.

use rusqlite::{Connection, OptionalExtension};
use std::collections::HashSet;
use thiserror::Error;

const HISTORY_TABLE: &str = "CREATE TABLE IF NOT EXISTS _leadline_migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);";

/// `(name, sql)` in apply order. Append only.
const MIGRATIONS: &[(&str, &str)] = &[
    ("001_sessions", include_str!("migrations/001_sessions.sql")),
    ("002_turns", include_str!("migrations/002_turns.sql")),
    ("003_lead_ledgers", include_str!("migrations/003_lead_ledgers.sql")),
];

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("could not read migration history: {0}")]
    History(#[source] rusqlite::Error),

    #[error("migration '{name}' failed: {source}")]
    Apply {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The database was migrated by a newer build.
    #[error("database has unknown migration '{0}'")]
    Unknown(String),
}

/// Brings the schema up to date and returns how many migrations ran.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply(conn, MIGRATIONS)
}

fn applied_names(conn: &Connection) -> rusqlite::Result<HashSet<String>> {
    conn.execute_batch(HISTORY_TABLE)?;
    let mut stmt = conn.prepare("SELECT name FROM _leadline_migrations")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(names)
}

fn apply(conn: &Connection, migrations: &[(&str, &str)]) -> Result<usize, MigrationError> {
    let done = applied_names(conn).map_err(MigrationError::History)?;
    if let Some(unknown) = done
        .iter()
        .find(|name| !migrations.iter().any(|(known, _)| *known == name.as_str()))
    {
        return Err(MigrationError::Unknown(unknown.clone()));
    }

    let mut count = 0;
    for (name, sql) in migrations.iter().filter(|(name, _)| !done.contains(*name)) {
        let apply_err = |source: rusqlite::Error| MigrationError::Apply {
            name: name.to_string(),
            source,
        };
        let tx = conn.unchecked_transaction().map_err(apply_err)?;
        tx.execute_batch(sql).map_err(apply_err)?;
        tx.execute("INSERT INTO _leadline_migrations (name) VALUES (?1)", [name])
            .map_err(apply_err)?;
        tx.commit().map_err(apply_err)?;

        tracing::info!(migration = name, "applied migration");
        count += 1;
    }
    Ok(count)
}

/// Name of the newest applied migration, if any.
pub fn schema_version(conn: &Connection) -> Result<Option<String>, MigrationError> {
    conn.execute_batch(HISTORY_TABLE)
        .map_err(MigrationError::History)?;
    conn.query_row(
        "SELECT name FROM _leadline_migrations ORDER BY id DESC LIMIT 1",
        [],
        |row| row.get(0),
    )
    .optional()
    .map_err(MigrationError::History)
}
