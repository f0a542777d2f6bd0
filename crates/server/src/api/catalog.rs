//! Catalog read-back handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use mosaic_core::catalog::{Artwork, CatalogStats, Creator};
use mosaic_core::CatalogError;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn catalog_error(what: &str, id: &str, e: CatalogError) -> (StatusCode, Json<ErrorResponse>) {
    match e {
        CatalogError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("{} not found: {}", what, id),
            }),
        ),
        e => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        ),
    }
}

/// GET /api/v1/catalog/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CatalogStats>, impl IntoResponse> {
    match state.catalog().stats() {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

/// GET /api/v1/catalog/artworks/{id}
///
/// Get an artwork with its linked creators.
pub async fn get_artwork(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Artwork>, impl IntoResponse> {
    state
        .catalog()
        .get_artwork(&id)
        .map(Json)
        .map_err(|e| catalog_error("Artwork", &id, e))
}

/// GET /api/v1/catalog/creators/{id}
pub async fn get_creator(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Creator>, impl IntoResponse> {
    state
        .catalog()
        .get_creator(&id)
        .map(Json)
        .map_err(|e| catalog_error("Creator", &id, e))
}
