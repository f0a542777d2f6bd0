use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use mosaic_core::import::RecordKind;
use mosaic_core::{AuditError, AuditFilter, AuditRecord};

use crate::state::AppState;

/// Maximum allowed limit for audit queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for audit queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for audit endpoint
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    /// Filter by import ID
    pub import_id: Option<String>,
    /// Filter by event type
    pub event_type: Option<String>,
    /// Filter by user ID
    pub user_id: Option<String>,
    /// Filter by record kind ("artwork" or "creator")
    pub kind: Option<RecordKind>,
    /// Position of the record in its input array; requires `kind`
    pub index: Option<u32>,
    /// Only failures: rejected, aborted or timed-out imports, failed records and photos
    #[serde(default)]
    pub failed: bool,
    /// Filter events after this timestamp (ISO 8601)
    pub from: Option<DateTime<Utc>>,
    /// Filter events before this timestamp (ISO 8601)
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of events to return (default 100, max 1000)
    pub limit: Option<i64>,
    /// Pagination offset (default 0)
    pub offset: Option<i64>,
}

/// Response for audit query endpoint
#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    /// List of audit events
    pub events: Vec<AuditRecord>,
    /// Total number of matching events
    pub total: i64,
    /// Limit used for this query
    pub limit: i64,
    /// Offset used for this query
    pub offset: i64,
}

/// Error response for audit queries
#[derive(Debug, Serialize)]
pub struct AuditErrorResponse {
    pub error: String,
}

/// GET /api/v1/audit
///
/// Query the import audit log, newest first.
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditQueryResponse>, (StatusCode, Json<AuditErrorResponse>)> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT);

    let offset = params.offset.unwrap_or(0).max(0);

    // Shared between query and count
    let mut base_filter = AuditFilter::new();

    if let Some(ref import_id) = params.import_id {
        base_filter = base_filter.with_import_id(import_id);
    }

    if let Some(ref event_type) = params.event_type {
        base_filter = base_filter.with_event_type(event_type);
    }

    if let Some(ref user_id) = params.user_id {
        base_filter = base_filter.with_user_id(user_id);
    }

    match (params.kind, params.index) {
        (Some(kind), Some(index)) => base_filter = base_filter.with_record(kind, index),
        (Some(kind), None) => base_filter = base_filter.with_record_kind(kind),
        (None, Some(_)) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(AuditErrorResponse {
                    error: "index requires kind".to_string(),
                }),
            ))
        }
        (None, None) => {}
    }

    if params.failed {
        base_filter = base_filter.failures_only();
    }

    if params.from.is_some() || params.to.is_some() {
        base_filter = base_filter.with_time_range(params.from, params.to);
    }

    let query_filter = base_filter.clone().with_limit(limit).with_offset(offset);

    let store = state.audit_store();
    let events = store
        .query(&query_filter)
        .map_err(|e| store_error("query", e))?;
    let total = store
        .count(&base_filter)
        .map_err(|e| store_error("count", e))?;

    Ok(Json(AuditQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}

fn store_error(action: &str, e: AuditError) -> (StatusCode, Json<AuditErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(AuditErrorResponse {
            error: format!("Failed to {} audit events: {}", action, e),
        }),
    )
}
