//! Database layer for Leadline.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. Sessions, turns, and the three lead ledgers
//! all live in one SQLite file created through the versioned migrations
//! managed here.
//!
//! Query helpers live with the crates that own each table
//! (`leadline-sessions`, `leadline-leads`); this crate owns the schema, the
//! pool, and the timestamp format they share.

mod migrations;
mod pool;
mod timestamp;

pub use migrations::{run_migrations, schema_version, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use timestamp::{parse_sqlite_timestamp, sqlite_timestamp, SQLITE_TIMESTAMP_FORMAT};
