use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::info;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::schema;

/// Shared handle to the migrated incident database.
///
/// Every access goes through one `parking_lot::Mutex`, so statements issued
/// from different threads never interleave on the connection. Clones share
/// the same connection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Database {
    /// Open or create the database described by `config` and apply pending migrations.
    ///
    /// Any engine failure while opening, configuring or migrating is reported
    /// as `StoreError::Open`.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let path = config.db_path.as_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
        }

        let conn = Self::connect(config).map_err(|e| open_failure(path, e))?;
        Self::bootstrap(conn, path.to_owned())
    }

    /// Open a database file with default settings.
    pub fn open_path(path: &Path) -> Result<Self, StoreError> {
        Self::open(&StoreConfig::at(path))
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|e| open_failure(&path, e.into()))?;
        Self::bootstrap(conn, path)
    }

    fn connect(config: &StoreConfig) -> Result<Connection, StoreError> {
        let conn = Connection::open(&config.db_path)?;
        // Installed first so every later lock acquisition waits instead of failing busy.
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

        if config.wal {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            tracing::debug!(mode = %mode, "journal mode set");
        }
        Ok(conn)
    }

    fn bootstrap(conn: Connection, path: PathBuf) -> Result<Self, StoreError> {
        let schema_version = conn
            .execute_batch(schema::PRAGMAS)
            .map_err(StoreError::from)
            .and_then(|()| schema::migrate(&conn))
            .map_err(|e| open_failure(&path, e))?;

        info!(path = %path.display(), schema_version, "database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Execute a closure with the database connection locked.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let key = Arc::as_ptr(&self.conn) as usize;
        if HELD.with(|held| held.borrow().contains(&key)) {
            return Err(StoreError::Reentrant);
        }
        let conn = self.conn.lock();
        let _held = HeldGuard::enter(key);
        f(&conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Engine errors raised before the handle is usable become `Open`.
fn open_failure(path: &Path, err: StoreError) -> StoreError {
    match err {
        StoreError::Database(source) => StoreError::Open {
            path: path.to_owned(),
            source,
        },
        other => other,
    }
}

thread_local! {
    // Connections locked by the current thread, so nested use reports an
    // error instead of deadlocking on the non-reentrant mutex.
    static HELD: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

struct HeldGuard(usize);

impl HeldGuard {
    fn enter(key: usize) -> Self {
        HELD.with(|held| held.borrow_mut().push(key));
        Self(key)
    }
}

impl Drop for HeldGuard {
    fn drop(&mut self) {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(pos) = held.iter().rposition(|k| *k == self.0) {
                held.remove(pos);
            }
        });
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            path: self.path.clone(),
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
