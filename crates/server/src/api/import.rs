//! Mass-import endpoint.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use mosaic_core::import::{FieldError, MAX_BATCH_SIZE};
use mosaic_core::{ImportError, ImportResponse};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::state::AppState;

/// Error body for a failed import request.
///
/// `errors` is set for validation failures; `partial` carries whatever was
/// recorded before the time budget ran out or the catalog went away.
#[derive(Debug, Serialize)]
pub struct ImportErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<ImportResponse>,
}

impl ImportErrorResponse {
    fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
            errors: None,
            partial: None,
        }
    }
}

/// Request body cap for the import route.
///
/// A record at its field limits (10k description, 10 photo URLs, tags)
/// stays well under 64 KiB of JSON, so a full batch fits.
pub const IMPORT_BODY_LIMIT: usize = MAX_BATCH_SIZE * 64 * 1024;

type ImportRejection = (StatusCode, Json<ImportErrorResponse>);

/// POST /api/v1/import
///
/// Run one mass-import batch synchronously and return the per-record report.
/// The body is taken as raw JSON so that shape problems are reported as
/// field-level validation errors rather than a generic extractor rejection.
pub async fn import_batch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ImportResponse>, ImportRejection> {
    let Json(body) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected unparsable import body");
        let status = rejection.status();
        let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            "invalid_json"
        };
        (
            status,
            Json(ImportErrorResponse::new(rejection.body_text(), code)),
        )
    })?;

    state
        .import_service()
        .run(&body)
        .await
        .map(Json)
        .map_err(into_rejection)
}

fn into_rejection(err: ImportError) -> ImportRejection {
    let message = err.to_string();
    let code = err.code();
    match err {
        ImportError::Validation(errors) => (
            StatusCode::BAD_REQUEST,
            Json(ImportErrorResponse {
                errors: Some(errors.errors),
                ..ImportErrorResponse::new(message, code)
            }),
        ),
        ImportError::BudgetExceeded { partial, .. } => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(ImportErrorResponse {
                partial: Some(*partial),
                ..ImportErrorResponse::new(message, code)
            }),
        ),
        ImportError::CatalogUnavailable { partial, .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ImportErrorResponse {
                partial: partial.map(|p| *p),
                ..ImportErrorResponse::new(message, code)
            }),
        ),
        ImportError::Internal(_) => {
            error!(error = %message, "Import failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ImportErrorResponse::new(message, code)),
            )
        }
    }
}
