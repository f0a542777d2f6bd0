use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Import lifecycle
    ImportStarted {
        import_id: String,
        /// System identity the import is attributed to
        user_id: String,
        plugin_name: String,
        original_data_source: String,
        artworks: u32,
        artists: u32,
    },
    /// Request failed validation; nothing was written.
    ImportRejected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        import_id: Option<String>,
        user_id: String,
        error_count: u32,
        /// Offending field paths
        fields: Vec<String>,
    },
    ImportCompleted {
        import_id: String,
        user_id: String,
        total_processed: u32,
        total_succeeded: u32,
        total_failed: u32,
        total_duplicates: u32,
        duration_ms: u64,
    },
    /// Time budget ran out before every record was started.
    ImportTimedOut {
        import_id: String,
        user_id: String,
        processed: u32,
        remaining: u32,
        budget_secs: u64,
    },
    /// The catalog went away mid-import; remaining records were not started.
    ImportAborted {
        import_id: String,
        user_id: String,
        processed: u32,
        remaining: u32,
        reason: String,
    },

    // Record events
    ArtworkCreated {
        import_id: String,
        artwork_id: String,
        /// Position in data.artworks
        index: u32,
        title: String,
        photos: u32,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        creator_ids: Vec<String>,
    },
    CreatorCreated {
        import_id: String,
        creator_id: String,
        /// Position in data.artists
        index: u32,
        name: String,
    },
    DuplicateDetected {
        import_id: String,
        /// "artwork" or "creator"
        kind: String,
        index: u32,
        existing_id: String,
        confidence: f64,
        new_tags_added: u32,
    },
    CreatorAutoCreated {
        import_id: String,
        creator_id: String,
        name: String,
        source_artwork_id: String,
    },
    RecordFailed {
        import_id: String,
        kind: String,
        index: u32,
        reason: String,
    },
    PhotoFailed {
        import_id: String,
        /// Position of the artwork in data.artworks
        index: u32,
        /// Position of the photo in the artwork's photos
        photo_index: u32,
        url: String,
        reason: String,
    },
}

impl AuditEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::ImportStarted { .. } => "import_started",
            Self::ImportRejected { .. } => "import_rejected",
            Self::ImportCompleted { .. } => "import_completed",
            Self::ImportTimedOut { .. } => "import_timed_out",
            Self::ImportAborted { .. } => "import_aborted",
            Self::ArtworkCreated { .. } => "artwork_created",
            Self::CreatorCreated { .. } => "creator_created",
            Self::DuplicateDetected { .. } => "duplicate_detected",
            Self::CreatorAutoCreated { .. } => "creator_auto_created",
            Self::RecordFailed { .. } => "record_failed",
            Self::PhotoFailed { .. } => "photo_failed",
        }
    }

    pub fn import_id(&self) -> Option<&str> {
        match self {
            Self::ImportStarted { import_id, .. }
            | Self::ImportCompleted { import_id, .. }
            | Self::ImportTimedOut { import_id, .. }
            | Self::ImportAborted { import_id, .. }
            | Self::ArtworkCreated { import_id, .. }
            | Self::CreatorCreated { import_id, .. }
            | Self::DuplicateDetected { import_id, .. }
            | Self::CreatorAutoCreated { import_id, .. }
            | Self::RecordFailed { import_id, .. }
            | Self::PhotoFailed { import_id, .. } => Some(import_id),
            Self::ImportRejected { import_id, .. } => import_id.as_deref(),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::ImportStarted { user_id, .. }
            | Self::ImportRejected { user_id, .. }
            | Self::ImportCompleted { user_id, .. }
            | Self::ImportTimedOut { user_id, .. }
            | Self::ImportAborted { user_id, .. } => Some(user_id),
            _ => None,
        }
    }

    /// Kind of record a record-level event is about.
    pub fn record_kind(&self) -> Option<&str> {
        match self {
            Self::ArtworkCreated { .. } | Self::PhotoFailed { .. } => Some("artwork"),
            Self::CreatorCreated { .. } | Self::CreatorAutoCreated { .. } => Some("creator"),
            Self::DuplicateDetected { kind, .. } | Self::RecordFailed { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Events that report something not getting imported.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::ImportRejected { .. }
                | Self::ImportTimedOut { .. }
                | Self::ImportAborted { .. }
                | Self::RecordFailed { .. }
                | Self::PhotoFailed { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub import_id: Option<String>,
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_kind: Option<String>,
    #[serde(default)]
    pub failure: bool,
    pub data: AuditEvent,
}

impl AuditRecord {
    /// Build an unsaved record (id 0) from an event.
    pub fn from_event(timestamp: DateTime<Utc>, event: AuditEvent) -> Self {
        Self {
            id: 0,
            timestamp,
            event_type: event.event_type().to_string(),
            import_id: event.import_id().map(String::from),
            user_id: event.user_id().map(String::from),
            record_kind: event.record_kind().map(String::from),
            failure: event.is_failure(),
            data: event,
        }
    }
}
