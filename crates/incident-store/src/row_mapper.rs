//! Conversion between rows of the `incidents` table and [`Record`] values.

use chrono::{DateTime, Utc};
use incident_core::{Record, RecordId};
use rusqlite::types::FromSql;
use rusqlite::Row;
use tracing::warn;

use crate::error::StoreError;
use crate::schema::incidents;

/// Get a required column value by name, returning MalformedRow on failure.
pub fn get<T: FromSql>(row: &Row<'_>, column: &'static str) -> Result<T, StoreError> {
    row.get(column).map_err(|e| malformed(column, e.to_string()))
}

fn malformed(column: &'static str, detail: String) -> StoreError {
    warn!(table = incidents::TABLE, column, detail = %detail, "malformed incident row");
    StoreError::MalformedRow {
        table: incidents::TABLE,
        column,
        detail,
    }
}

/// Build a [`Record`] from a row selected with all four incident columns.
pub fn record_from_row(row: &Row<'_>) -> Result<Record, StoreError> {
    let raw_id: String = get(row, incidents::ID)?;
    let id: RecordId = raw_id
        .parse()
        .map_err(|e| malformed(incidents::ID, format!("invalid identifier {raw_id:?}: {e}")))?;

    let title: String = get(row, incidents::TITLE)?;

    let millis: i64 = get(row, incidents::OCCURRED_AT)?;
    let occurred_at = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        malformed(
            incidents::OCCURRED_AT,
            format!("timestamp out of range: {millis}"),
        )
    })?;

    let resolved: i64 = get(row, incidents::RESOLVED)?;

    Ok(Record::from_parts(id, title, occurred_at, resolved != 0))
}

/// Column values of one record, ready to bind to a write statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordRow {
    pub id: String,
    pub title: String,
    pub occurred_at: i64,
    pub resolved: i64,
}

impl From<&Record> for RecordRow {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id().to_string(),
            title: record.title().to_owned(),
            occurred_at: record.occurred_at().timestamp_millis(),
            resolved: i64::from(record.is_resolved()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rusqlite::Connection;

    fn map_single(select: &str) -> Result<Record, StoreError> {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare(select).unwrap();
        let mut rows = stmt.query([]).unwrap();
        let row = rows.next().unwrap().unwrap();
        record_from_row(row)
    }

    #[test]
    fn record_to_row_columns() {
        let id = RecordId::new();
        let at = Utc.timestamp_millis_opt(1_467_900_000_123).unwrap();
        let record = Record::from_parts(id, "Theft", at, true);
        let row = RecordRow::from(&record);
        assert_eq!(row.id, id.to_string());
        assert_eq!(row.title, "Theft");
        assert_eq!(row.occurred_at, 1_467_900_000_123);
        assert_eq!(row.resolved, 1);

        let unresolved = Record::from_parts(id, "", at, false);
        assert_eq!(RecordRow::from(&unresolved).resolved, 0);
    }

    #[test]
    fn row_to_record() {
        let id = RecordId::new();
        let record = map_single(&format!(
            "SELECT '{id}' AS id, 'Theft' AS title, 1467900000123 AS occurred_at, 1 AS resolved"
        ))
        .unwrap();
        assert_eq!(record.id(), id);
        assert_eq!(record.title(), "Theft");
        assert_eq!(record.occurred_at().timestamp_millis(), 1_467_900_000_123);
        assert!(record.is_resolved());
    }

    #[test]
    fn any_nonzero_resolved_is_true() {
        let id = RecordId::new();
        let record = map_single(&format!(
            "SELECT '{id}' AS id, '' AS title, 0 AS occurred_at, 7 AS resolved"
        ))
        .unwrap();
        assert!(record.is_resolved());
        assert_eq!(record.occurred_at(), Utc.timestamp_millis_opt(0).unwrap());
    }

    #[test]
    fn columns_are_read_by_name() {
        let id = RecordId::new();
        let record = map_single(&format!(
            "SELECT 0 AS resolved, 42 AS occurred_at, 'Arson' AS title, '{id}' AS id"
        ))
        .unwrap();
        assert_eq!(record.id(), id);
        assert_eq!(record.title(), "Arson");
        assert_eq!(record.occurred_at().timestamp_millis(), 42);
        assert!(!record.is_resolved());
    }

    #[test]
    fn invalid_id_is_malformed() {
        let err = map_single("SELECT 'U1' AS id, 't' AS title, 0 AS occurred_at, 0 AS resolved")
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::MalformedRow { table: "incidents", column: "id", .. }
        ));
    }

    #[test]
    fn wrong_type_is_malformed() {
        let id = RecordId::new();
        let err = map_single(&format!(
            "SELECT '{id}' AS id, 't' AS title, 'yesterday' AS occurred_at, 0 AS resolved"
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            StoreError::MalformedRow { column: "occurred_at", .. }
        ));
    }

    #[test]
    fn null_title_is_malformed() {
        let id = RecordId::new();
        let err = map_single(&format!(
            "SELECT '{id}' AS id, NULL AS title, 0 AS occurred_at, 0 AS resolved"
        ))
        .unwrap_err();
        assert!(matches!(err, StoreError::MalformedRow { column: "title", .. }));
    }

    #[test]
    fn missing_column_is_malformed() {
        let id = RecordId::new();
        let err = map_single(&format!("SELECT '{id}' AS id, 't' AS title, 0 AS occurred_at"))
            .unwrap_err();
        assert!(matches!(err, StoreError::MalformedRow { column: "resolved", .. }));
    }

    #[test]
    fn out_of_range_timestamp_is_malformed() {
        let id = RecordId::new();
        let err = map_single(&format!(
            "SELECT '{id}' AS id, 't' AS title, {} AS occurred_at, 0 AS resolved",
            i64::MAX
        ))
        .unwrap_err();
        assert!(matches!(err, StoreError::MalformedRow { column: "occurred_at", .. }));
    }
}
