//! Table layout and version-gated bootstrap for the incident database.
//!
//! `PRAGMA user_version` holds the number of migrations applied so far.

use rusqlite::Connection;
use tracing::info;

use crate::error::StoreError;

/// Table and column names of the incident table.
pub mod incidents {
    pub const TABLE: &str = "incidents";
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const OCCURRED_AT: &str = "occurred_at";
    pub const RESOLVED: &str = "resolved";
}

const MIGRATIONS: &[&str] = &[r#"
CREATE TABLE IF NOT EXISTS incidents (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    occurred_at INTEGER NOT NULL,
    resolved INTEGER NOT NULL DEFAULT 0 CHECK (resolved IN (0, 1))
);
"#];

pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

pub const PRAGMAS: &str = r#"
PRAGMA foreign_keys = ON;
PRAGMA synchronous = NORMAL;
"#;

pub fn user_version(conn: &Connection) -> Result<u32, StoreError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the database up to `SCHEMA_VERSION`, returning the resulting version.
pub fn migrate(conn: &Connection) -> Result<u32, StoreError> {
    let found = user_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchema {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    for (idx, sql) in MIGRATIONS.iter().enumerate().skip(found as usize) {
        let version = idx as u32 + 1;
        conn.execute_batch(sql)?;
        conn.pragma_update(None, "user_version", version)?;
        info!(version, "applied schema migration");
    }

    Ok(SCHEMA_VERSION)
}
