use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RecordId;

/// One incident.
///
/// `occurred_at` is kept at millisecond precision, the resolution it is
/// persisted with, so a record read back from storage compares equal to the
/// one that was written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RecordFields")]
pub struct Record {
    id: RecordId,
    title: String,
    occurred_at: DateTime<Utc>,
    resolved: bool,
}

impl Record {
    /// A new, unsaved incident: fresh id, empty title, happening now, unresolved.
    pub fn new() -> Self {
        Self::with_id(RecordId::new())
    }

    pub fn with_id(id: RecordId) -> Self {
        Self::from_parts(id, String::new(), Utc::now(), false)
    }

    pub fn from_parts(
        id: RecordId,
        title: impl Into<String>,
        occurred_at: DateTime<Utc>,
        resolved: bool,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            occurred_at: occurred_at.trunc_subsecs(3),
            resolved,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn set_occurred_at(&mut self, occurred_at: DateTime<Utc>) {
        self.occurred_at = occurred_at.trunc_subsecs(3);
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn set_resolved(&mut self, resolved: bool) {
        self.resolved = resolved;
    }
}

/// Wire shape of a [`Record`]; deserialization goes through `from_parts`.
#[derive(Deserialize)]
struct RecordFields {
    id: RecordId,
    title: String,
    occurred_at: DateTime<Utc>,
    resolved: bool,
}

impl From<RecordFields> for Record {
    fn from(fields: RecordFields) -> Self {
        Self::from_parts(fields.id, fields.title, fields.occurred_at, fields.resolved)
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}
