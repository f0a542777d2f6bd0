use chrono::{DateTime, Utc};
use thiserror::Error;

use super::AuditRecord;
use crate::import::RecordKind;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Query over the audit log. Newest events come first.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub import_id: Option<String>,
    pub event_type: Option<String>,
    pub user_id: Option<String>,
    /// Only events about records of this kind.
    pub record_kind: Option<RecordKind>,
    /// Position of the record in its input array; pair with `record_kind`.
    pub record_index: Option<u32>,
    /// Only rejected, aborted or timed-out imports and failed records or photos.
    pub failures_only: bool,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn with_import_id(mut self, import_id: impl Into<String>) -> Self {
        self.import_id = Some(import_id.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_record_kind(mut self, kind: RecordKind) -> Self {
        self.record_kind = Some(kind);
        self
    }

    /// History of one input record, e.g. artwork #3 of an import.
    pub fn with_record(mut self, kind: RecordKind, index: u32) -> Self {
        self.record_kind = Some(kind);
        self.record_index = Some(index);
        self
    }

    pub fn failures_only(mut self) -> Self {
        self.failures_only = true;
        self
    }

    pub fn with_time_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Append-only storage for audit records.
pub trait AuditStore: Send + Sync {
    /// Persist a record and return its assigned id.
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError>;

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError>;

    /// Number of records matching the filter, ignoring limit and offset.
    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError>;
}
