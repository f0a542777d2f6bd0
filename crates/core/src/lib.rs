pub mod audit;
pub mod catalog;
pub mod config;
pub mod creators;
pub mod dedup;
pub mod geo;
pub mod import;
pub mod metrics;
pub mod photos;
pub mod storage;
pub mod testing;

pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditEventEnvelope, AuditFilter, AuditHandle,
    AuditRecord, AuditStore, AuditWriter, SqliteAuditStore,
};
pub use catalog::{CatalogError, CatalogStore, SqliteCatalog};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ImportSettings,
    SanitizedConfig,
};
pub use import::{
    validate_request, ImportError, ImportRequest, ImportResponse, ImportService, ValidationErrors,
};
pub use photos::{HttpPhotoFetcher, PhotoFetcher};
pub use storage::{FsObjectStore, ObjectStore};
