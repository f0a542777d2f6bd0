use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::Layer;
use tower_http::{
    services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use super::{audit, catalog, handlers, import, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let photo_root = state.config().storage.root.clone();

    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Import
        .route(
            "/import",
            post(import::import_batch).layer(DefaultBodyLimit::max(import::IMPORT_BODY_LIMIT)),
        )
        // Catalog read-back
        .route("/catalog/stats", get(catalog::get_stats))
        .route("/catalog/artworks/{id}", get(catalog::get_artwork))
        .route("/catalog/creators/{id}", get(catalog::get_creator))
        // Audit
        .route("/audit", get(audit::query_audit))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics).with_state(state))
        .nest_service(
            "/photos",
            SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            )
            .layer(ServeDir::new(photo_root)),
        )
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
