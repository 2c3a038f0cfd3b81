use incident_core::{Record, RecordId};
use rusqlite::{named_params, Params, Rows};
use tracing::{debug, instrument};

use crate::database::Database;
use crate::error::{is_constraint_failure, StoreError};
use crate::row_mapper::{self, RecordRow};

const INSERT: &str = "INSERT INTO incidents (id, title, occurred_at, resolved)
     VALUES (:id, :title, :occurred_at, :resolved)";
const UPDATE: &str = "UPDATE incidents
     SET title = :title, occurred_at = :occurred_at, resolved = :resolved
     WHERE id = :id";
const DELETE: &str = "DELETE FROM incidents WHERE id = :id";
const SELECT_ONE: &str = "SELECT id, title, occurred_at, resolved FROM incidents WHERE id = :id";
const SELECT_ALL: &str = "SELECT id, title, occurred_at, resolved FROM incidents";
const COUNT: &str = "SELECT COUNT(*) FROM incidents";

/// Forward-only, single-pass sequence of records over one query result.
///
/// Only lives inside a store query closure such as [`RecordStore::with_all`].
/// The statement is reset when the cursor is dropped. Fused after exhaustion
/// or the first error.
pub struct RecordCursor<'stmt> {
    rows: Rows<'stmt>,
    done: bool,
}

impl<'stmt> RecordCursor<'stmt> {
    fn new(rows: Rows<'stmt>) -> Self {
        Self { rows, done: false }
    }
}

impl Iterator for RecordCursor<'_> {
    type Item = Result<Record, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = match self.rows.next() {
            Ok(Some(row)) => row_mapper::record_from_row(row),
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => Err(e.into()),
        };
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

impl std::iter::FusedIterator for RecordCursor<'_> {}

/// CRUD over the `incidents` table.
#[derive(Clone, Debug)]
pub struct RecordStore {
    db: Database,
}

impl RecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Insert a new record. Fails with `ConstraintViolation` if the id is taken.
    #[instrument(skip(self, record), fields(record_id = %record.id()))]
    pub fn create(&self, record: &Record) -> Result<(), StoreError> {
        let row = RecordRow::from(record);
        let inserted = self.execute(
            INSERT,
            named_params! {
                ":id": row.id,
                ":title": row.title,
                ":occurred_at": row.occurred_at,
                ":resolved": row.resolved,
            },
        );
        match inserted {
            Ok(_) => {
                debug!("record created");
                Ok(())
            }
            Err(StoreError::Database(e)) if is_constraint_failure(&e) => {
                Err(StoreError::ConstraintViolation { id: record.id() })
            }
            Err(e) => Err(e),
        }
    }

    /// Overwrite the mutable fields of an existing record.
    ///
    /// Returns the number of rows changed; a missing id changes nothing and
    /// never inserts.
    #[instrument(skip(self, record), fields(record_id = %record.id()))]
    pub fn update(&self, record: &Record) -> Result<usize, StoreError> {
        let row = RecordRow::from(record);
        let rows = self.execute(
            UPDATE,
            named_params! {
                ":id": row.id,
                ":title": row.title,
                ":occurred_at": row.occurred_at,
                ":resolved": row.resolved,
            },
        )?;
        debug!(rows, "record updated");
        Ok(rows)
    }

    /// Delete a record. Returns the number of rows removed (0 if absent).
    #[instrument(skip(self, id), fields(record_id = %id))]
    pub fn delete(&self, id: &RecordId) -> Result<usize, StoreError> {
        self.delete_raw_id(&id.to_string())
    }

    /// Delete by caller-supplied id text that has not been parsed.
    #[instrument(skip(self))]
    pub fn delete_raw_id(&self, id: &str) -> Result<usize, StoreError> {
        let rows = self.execute(DELETE, named_params! { ":id": id })?;
        debug!(rows, "record deleted");
        Ok(rows)
    }

    #[instrument(skip(self, id), fields(record_id = %id))]
    pub fn find(&self, id: &RecordId) -> Result<Option<Record>, StoreError> {
        self.find_raw_id(&id.to_string())
    }

    /// Look up by caller-supplied id text that has not been parsed.
    #[instrument(skip(self))]
    pub fn find_raw_id(&self, id: &str) -> Result<Option<Record>, StoreError> {
        self.query(SELECT_ONE, named_params! { ":id": id }, |mut cursor| {
            cursor.next().transpose()
        })
    }

    /// All records, in storage order.
    #[instrument(skip(self))]
    pub fn list_all(&self) -> Result<Vec<Record>, StoreError> {
        let records = self.with_all(|cursor| cursor.collect::<Result<Vec<_>, _>>())?;
        debug!(count = records.len(), "records listed");
        Ok(records)
    }

    /// Stream every record through `f` without materializing the result set.
    ///
    /// The connection stays locked while `f` runs. Calling back into the same
    /// store from `f` would deadlock on the mutex, so such calls fail with
    /// `StoreError::Reentrant` instead.
    pub fn with_all<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(RecordCursor<'_>) -> Result<T, StoreError>,
    {
        self.query(SELECT_ALL, [], f)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(COUNT, [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Run a write statement. `sql` is static text; every value arrives as a bound parameter.
    fn execute<P: Params>(&self, sql: &'static str, params: P) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            Ok(stmt.execute(params)?)
        })
    }

    /// Run a read statement and hand its rows to `f` as a cursor scoped to the call.
    fn query<P, F, T>(&self, sql: &'static str, params: P, f: F) -> Result<T, StoreError>
    where
        P: Params,
        F: FnOnce(RecordCursor<'_>) -> Result<T, StoreError>,
    {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let rows = stmt.query(params)?;
            f(RecordCursor::new(rows))
        })
    }
}
