//! In-process test fixture for the HTTP surface.
//!
//! Builds the real router over a temporary SQLite database with the photo
//! fetcher and object store swapped for in-memory doubles.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use mosaic_core::config::{DatabaseConfig, ServerConfig, StorageConfig};
use mosaic_core::testing::{MemoryObjectStore, MockPhotoFetcher};
use mosaic_core::{
    create_audit_system, AuditStore, CatalogStore, Config, ImportService, ImportSettings,
    ObjectStore, PhotoFetcher, SqliteAuditStore, SqliteCatalog,
};
use mosaic_server::state::AppState;

pub use mosaic_core::testing::fixtures;

pub struct TestFixture {
    pub router: Router,
    /// Configure remote photo responses here.
    pub fetcher: Arc<MockPhotoFetcher>,
    pub objects: Arc<MemoryObjectStore>,
    pub catalog: Arc<SqliteCatalog>,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_settings(ImportSettings::default()).await
    }

    pub async fn with_settings(settings: ImportSettings) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let photo_root = temp_dir.path().join("photos");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            storage: StorageConfig {
                root: photo_root,
                public_base_url: "https://cdn.test".to_string(),
            },
            import: settings.clone(),
        };

        let catalog = Arc::new(SqliteCatalog::new(&db_path).expect("Failed to create catalog"));
        let audit_store: Arc<dyn AuditStore> = Arc::new(
            SqliteAuditStore::new(&temp_dir.path().join("audit.db"))
                .expect("Failed to create audit store"),
        );
        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let fetcher = Arc::new(MockPhotoFetcher::new());
        let objects = Arc::new(MemoryObjectStore::new("https://cdn.test"));

        let import_service = ImportService::new(
            Arc::clone(&catalog) as Arc<dyn CatalogStore>,
            Arc::clone(&fetcher) as Arc<dyn PhotoFetcher>,
            Arc::clone(&objects) as Arc<dyn ObjectStore>,
            settings,
        )
        .with_audit(audit_handle);

        let state = Arc::new(AppState::new(
            config,
            import_service,
            Arc::clone(&catalog) as Arc<dyn CatalogStore>,
            audit_store,
        ));
        let router = mosaic_server::api::create_router(state);

        Self {
            router,
            fetcher,
            objects,
            catalog,
            temp_dir,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.post_raw(path, &serde_json::to_string(&body).unwrap())
            .await
    }

    /// POST a raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }

    /// Poll the audit endpoint until `event_type` shows up for `import_id`.
    ///
    /// The audit writer is asynchronous, so events land shortly after the
    /// response is returned.
    pub async fn wait_for_audit(&self, import_id: &str, event_type: &str) -> Value {
        let path = format!(
            "/api/v1/audit?import_id={}&event_type={}",
            import_id, event_type
        );
        for _ in 0..50 {
            let response = self.get(&path).await;
            if response.body["total"].as_i64().unwrap_or(0) > 0 {
                return response.body;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("audit event {} for {} never appeared", event_type, import_id);
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
