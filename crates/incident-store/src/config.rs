use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where and how the incident database is opened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file. Parent directories are created on open.
    pub db_path: PathBuf,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// Use write-ahead logging for file databases.
    pub wal: bool,
}

impl StoreConfig {
    pub fn at(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_owned(),
            ..Self::default()
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: dirs_fallback().join("database/incidents.db"),
            busy_timeout_ms: 5000,
            wal: true,
        }
    }
}

/// Fallback home dir for default paths.
fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".incidents")
}
