use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Well-known identity that every mass-imported record is attributed to.
pub const MASS_IMPORT_SYSTEM_USER: &str = "00000000-0000-0000-0000-000000000002";

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub import: ImportSettings,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mosaic.db")
}

/// Object storage for acquired photos.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory photos are written under.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Base URL the stored keys are served from.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            public_base_url: default_public_base_url(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("photos")
}

fn default_public_base_url() -> String {
    "http://localhost:8080/photos".to_string()
}

/// Process-wide settings for the mass-import pipeline.
///
/// Per-request tuning (threshold, weights, flags) travels in the request
/// itself; these are the operator-controlled limits around it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportSettings {
    /// Identity all imported records are attributed to.
    #[serde(default = "default_system_user_id")]
    pub system_user_id: String,
    /// Wall-clock budget for one whole batch.
    #[serde(default = "default_time_budget")]
    pub time_budget_secs: u64,
    /// Radius of the spatial pre-filter for duplicate detection, in meters.
    #[serde(default = "default_search_radius")]
    pub search_radius_m: f64,
    /// Concurrent photo fetches per artwork.
    #[serde(default = "default_photo_workers")]
    pub photo_workers: usize,
    /// Timeout for a single photo download.
    #[serde(default = "default_photo_timeout")]
    pub photo_timeout_secs: u64,
    /// User-Agent sent to remote photo hosts.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            system_user_id: default_system_user_id(),
            time_budget_secs: default_time_budget(),
            search_radius_m: default_search_radius(),
            photo_workers: default_photo_workers(),
            photo_timeout_secs: default_photo_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ImportSettings {
    pub fn with_time_budget_secs(mut self, secs: u64) -> Self {
        self.time_budget_secs = secs;
        self
    }

    pub fn with_photo_workers(mut self, workers: usize) -> Self {
        self.photo_workers = workers;
        self
    }

    pub fn with_search_radius_m(mut self, radius: f64) -> Self {
        self.search_radius_m = radius;
        self
    }

    pub fn with_photo_timeout_secs(mut self, secs: u64) -> Self {
        self.photo_timeout_secs = secs;
        self
    }
}

fn default_system_user_id() -> String {
    MASS_IMPORT_SYSTEM_USER.to_string()
}

fn default_time_budget() -> u64 {
    300
}

fn default_search_radius() -> f64 {
    500.0
}

fn default_photo_workers() -> usize {
    3
}

fn default_photo_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string()
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: SanitizedStorageConfig,
    pub import: ImportSettings,
}

/// Storage config without the local filesystem layout.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStorageConfig {
    pub public_base_url: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            storage: SanitizedStorageConfig {
                public_base_url: config.storage.public_base_url.clone(),
            },
            import: config.import.clone(),
        }
    }
}
