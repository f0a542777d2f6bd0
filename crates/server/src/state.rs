use std::sync::Arc;

use mosaic_core::{AuditStore, CatalogStore, Config, ImportService, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    import_service: ImportService,
    catalog: Arc<dyn CatalogStore>,
    audit_store: Arc<dyn AuditStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        import_service: ImportService,
        catalog: Arc<dyn CatalogStore>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            config,
            import_service,
            catalog,
            audit_store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn import_service(&self) -> &ImportService {
        &self.import_service
    }

    pub fn catalog(&self) -> &dyn CatalogStore {
        self.catalog.as_ref()
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }
}
