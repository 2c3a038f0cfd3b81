use std::path::PathBuf;

use incident_core::RecordId;
use rusqlite::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to open database at {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(String),

    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("record {id} already exists")]
    ConstraintViolation { id: RecordId },

    #[error("malformed row in {table}.{column}: {detail}")]
    MalformedRow {
        table: &'static str,
        column: &'static str,
        detail: String,
    },

    #[error("store used again while its connection is held by this thread")]
    Reentrant,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StoreError::ConstraintViolation { .. })
    }
}

/// True when SQLite rejected a write because of a table constraint.
pub(crate) fn is_constraint_failure(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}
