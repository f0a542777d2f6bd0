use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ToSql};

use super::{AuditError, AuditEvent, AuditFilter, AuditRecord, AuditStore};

/// Audit log persisted in a single SQLite table.
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> AuditError {
    AuditError::Database(e.to_string())
}

impl SqliteAuditStore {
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), AuditError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS audit_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                import_id TEXT,
                user_id TEXT,
                record_kind TEXT,
                failure INTEGER NOT NULL DEFAULT 0,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_events_import_id ON audit_events(import_id);
            CREATE INDEX IF NOT EXISTS idx_audit_events_event_type ON audit_events(event_type);
            CREATE INDEX IF NOT EXISTS idx_audit_events_failure ON audit_events(import_id, failure);
            "#,
        )
        .map_err(db_err)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AuditError> {
        self.conn
            .lock()
            .map_err(|_| AuditError::Database("audit connection lock poisoned".to_string()))
    }

    fn build_where_clause(filter: &AuditFilter) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ref import_id) = filter.import_id {
            conditions.push("import_id = ?");
            params.push(Box::new(import_id.clone()));
        }
        if let Some(ref event_type) = filter.event_type {
            conditions.push("event_type = ?");
            params.push(Box::new(event_type.clone()));
        }
        if let Some(ref user_id) = filter.user_id {
            conditions.push("user_id = ?");
            params.push(Box::new(user_id.clone()));
        }
        if let Some(kind) = filter.record_kind {
            conditions.push("record_kind = ?");
            params.push(Box::new(kind.as_str()));
        }
        if let Some(index) = filter.record_index {
            conditions.push("json_extract(data, '$.index') = ?");
            params.push(Box::new(index));
        }
        if filter.failures_only {
            conditions.push("failure = 1");
        }
        if let Some(ref from) = filter.from {
            conditions.push("timestamp >= ?");
            params.push(Box::new(from.to_rfc3339()));
        }
        if let Some(ref to) = filter.to {
            conditions.push("timestamp <= ?");
            params.push(Box::new(to.to_rfc3339()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (where_clause, params)
    }
}

impl AuditStore for SqliteAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let data_json = serde_json::to_string(&record.data)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO audit_events (timestamp, event_type, import_id, user_id, record_kind, failure, data)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                record.timestamp.to_rfc3339(),
                record.event_type,
                record.import_id,
                record.user_id,
                record.record_kind,
                record.failure,
                data_json,
            ],
        )
        .map_err(db_err)?;

        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let conn = self.lock()?;
        let (where_clause, mut params) = Self::build_where_clause(filter);

        // Events emitted within the same instant keep insertion order.
        let sql = format!(
            "SELECT id, timestamp, event_type, import_id, user_id, record_kind, failure, data
             FROM audit_events {} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        );
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;

        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, bool>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, timestamp, event_type, import_id, user_id, record_kind, failure, data_json) =
                row.map_err(db_err)?;

            let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| AuditError::Database(format!("Invalid timestamp: {}", e)))?
                .into();
            let data: AuditEvent = serde_json::from_str(&data_json)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;

            records.push(AuditRecord {
                id,
                timestamp,
                event_type,
                import_id,
                user_id,
                record_kind,
                failure,
                data,
            });
        }

        Ok(records)
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let conn = self.lock()?;
        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM audit_events {}", where_clause);
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::RecordKind;
    use chrono::Duration;

    fn create_test_store() -> SqliteAuditStore {
        SqliteAuditStore::in_memory().unwrap()
    }

    fn service_started() -> AuditRecord {
        AuditRecord::from_event(
            Utc::now(),
            AuditEvent::ServiceStarted {
                version: "0.1.0".to_string(),
                config_hash: "abc123".to_string(),
            },
        )
    }

    fn import_started(import_id: &str, user_id: &str) -> AuditRecord {
        AuditRecord::from_event(
            Utc::now(),
            AuditEvent::ImportStarted {
                import_id: import_id.to_string(),
                user_id: user_id.to_string(),
                plugin_name: "osm-artworks".to_string(),
                original_data_source: "osm".to_string(),
                artworks: 2,
                artists: 0,
            },
        )
    }

    fn duplicate_detected(import_id: &str, index: u32) -> AuditRecord {
        AuditRecord::from_event(
            Utc::now(),
            AuditEvent::DuplicateDetected {
                import_id: import_id.to_string(),
                kind: "artwork".to_string(),
                index,
                existing_id: "aw-existing".to_string(),
                confidence: 0.85,
                new_tags_added: 2,
            },
        )
    }

    #[test]
    fn test_insert_and_query_round_trips_event_data() {
        let store = create_test_store();
        let id = store.insert(&duplicate_detected("imp-1", 3)).unwrap();
        assert!(id > 0);

        let results = store.query(&AuditFilter::new()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].event_type, "duplicate_detected");
        match &results[0].data {
            AuditEvent::DuplicateDetected {
                index, confidence, ..
            } => {
                assert_eq!(*index, 3);
                assert!((confidence - 0.85).abs() < 1e-9);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_query_by_event_type() {
        let store = create_test_store();
        store.insert(&service_started()).unwrap();
        store.insert(&import_started("imp-1", "system")).unwrap();
        store.insert(&import_started("imp-2", "system")).unwrap();

        let filter = AuditFilter::new().with_event_type("import_started");
        assert_eq!(store.query(&filter).unwrap().len(), 2);

        let filter = AuditFilter::new().with_event_type("service_started");
        assert_eq!(store.query(&filter).unwrap().len(), 1);
    }

    #[test]
    fn test_query_by_import_id() {
        let store = create_test_store();
        store.insert(&import_started("imp-1", "system")).unwrap();
        store.insert(&duplicate_detected("imp-1", 0)).unwrap();
        store.insert(&import_started("imp-2", "system")).unwrap();

        let filter = AuditFilter::new().with_import_id("imp-1");
        let results = store.query(&filter).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.import_id.as_deref() == Some("imp-1")));
    }

    #[test]
    fn test_query_by_user_id() {
        let store = create_test_store();
        store.insert(&import_started("imp-1", "system-a")).unwrap();
        store.insert(&import_started("imp-2", "system-a")).unwrap();
        store.insert(&import_started("imp-3", "system-b")).unwrap();

        let filter = AuditFilter::new().with_user_id("system-a");
        assert_eq!(store.query(&filter).unwrap().len(), 2);
    }

    #[test]
    fn test_query_with_time_range() {
        let store = create_test_store();
        let now = Utc::now();

        let mut old_record = service_started();
        old_record.timestamp = now - Duration::hours(2);
        store.insert(&old_record).unwrap();

        let mut new_record = service_started();
        new_record.timestamp = now;
        store.insert(&new_record).unwrap();

        let filter = AuditFilter::new().with_time_range(Some(now - Duration::hours(1)), None);
        assert_eq!(store.query(&filter).unwrap().len(), 1);
    }

    fn record_failed(import_id: &str, kind: &str, index: u32) -> AuditRecord {
        AuditRecord::from_event(
            Utc::now(),
            AuditEvent::RecordFailed {
                import_id: import_id.to_string(),
                kind: kind.to_string(),
                index,
                reason: "catalog write failed".to_string(),
            },
        )
    }

    #[test]
    fn test_query_failures_by_kind() {
        let store = create_test_store();
        store.insert(&import_started("imp-1", "system")).unwrap();
        store.insert(&duplicate_detected("imp-1", 0)).unwrap();
        store.insert(&record_failed("imp-1", "artwork", 1)).unwrap();
        store.insert(&record_failed("imp-1", "creator", 0)).unwrap();
        store.insert(&record_failed("imp-2", "artwork", 0)).unwrap();

        let failed = AuditFilter::new().with_import_id("imp-1").failures_only();
        assert_eq!(store.count(&failed).unwrap(), 2);

        let failed_artworks = failed.clone().with_record_kind(RecordKind::Artwork);
        let results = store.query(&failed_artworks).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record_kind.as_deref(), Some("artwork"));
        assert!(results[0].failure);

        let artworks = AuditFilter::new()
            .with_import_id("imp-1")
            .with_record_kind(RecordKind::Artwork);
        assert_eq!(store.count(&artworks).unwrap(), 2);
    }

    #[test]
    fn test_query_single_record_history() {
        let store = create_test_store();
        store.insert(&duplicate_detected("imp-1", 0)).unwrap();
        store.insert(&duplicate_detected("imp-1", 1)).unwrap();
        store.insert(&record_failed("imp-1", "artwork", 1)).unwrap();
        store.insert(&record_failed("imp-1", "creator", 1)).unwrap();

        let filter = AuditFilter::new()
            .with_import_id("imp-1")
            .with_record(RecordKind::Artwork, 1);
        let results = store.query(&filter).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].event_type, "record_failed");
        assert_eq!(results[1].event_type, "duplicate_detected");
    }

    #[test]
    fn test_pagination() {
        let store = create_test_store();
        for i in 0..5 {
            store.insert(&duplicate_detected("imp-1", i)).unwrap();
        }

        let page = |offset| {
            store
                .query(&AuditFilter::new().with_limit(2).with_offset(offset))
                .unwrap()
                .len()
        };
        assert_eq!(page(0), 2);
        assert_eq!(page(2), 2);
        assert_eq!(page(4), 1);
    }

    #[test]
    fn test_count() {
        let store = create_test_store();
        store.insert(&service_started()).unwrap();
        store.insert(&import_started("imp-1", "system")).unwrap();
        store.insert(&duplicate_detected("imp-1", 0)).unwrap();

        assert_eq!(store.count(&AuditFilter::new()).unwrap(), 3);
        let filter = AuditFilter::new().with_import_id("imp-1");
        assert_eq!(store.count(&filter).unwrap(), 2);
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("audit.db");

        let store = SqliteAuditStore::new(&db_path).unwrap();
        store.insert(&service_started()).unwrap();
        assert!(db_path.exists());

        drop(store);
        let reopened = SqliteAuditStore::new(&db_path).unwrap();
        assert_eq!(reopened.count(&AuditFilter::new()).unwrap(), 1);
    }
}
