//! Types for the artwork and creator catalog.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::photos::ProcessedPhoto;

/// Free-form tag mapping carried by every catalog entity.
pub type Tags = BTreeMap<String, serde_json::Value>;

/// Moderation status of a catalog entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    Pending,
    #[default]
    Approved,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            _ => Self::Approved,
        }
    }
}

/// Lightweight reference to a linked creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorRef {
    pub id: String,
    pub name: String,
}

/// An artwork stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artwork {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Creator text exactly as it arrived with the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_names: Option<String>,
    /// Creator entities linked to this artwork.
    pub creators: Vec<CreatorRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub source: String,
    pub tags: Tags,
    pub photos: Vec<ProcessedPhoto>,
    pub status: EntityStatus,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Artwork to be inserted.
#[derive(Debug, Clone)]
pub struct NewArtwork {
    pub title: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub creator_names: Option<String>,
    pub external_id: Option<String>,
    pub source: String,
    pub tags: Tags,
    pub photos: Vec<ProcessedPhoto>,
    pub status: EntityStatus,
    pub created_by: String,
    pub import_id: Option<String>,
}

/// An artwork returned by the spatial pre-filter, with its distance.
#[derive(Debug, Clone)]
pub struct NearbyArtwork {
    pub artwork: Artwork,
    pub distance_m: f64,
}

/// A creator stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub tags: Tags,
    pub status: EntityStatus,
    /// Stub created to satisfy an artwork's creator reference.
    pub auto_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_artwork_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Creator to be inserted.
#[derive(Debug, Clone, Default)]
pub struct NewCreator {
    pub name: String,
    pub bio: Option<String>,
    pub external_id: Option<String>,
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
    pub website: Option<String>,
    pub tags: Tags,
    pub status: EntityStatus,
    pub auto_created: bool,
    pub source_artwork_id: Option<String>,
    pub created_by: String,
}

/// Catalog statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_artworks: u64,
    pub total_creators: u64,
    pub auto_created_creators: u64,
    pub artwork_creator_links: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_artwork: Option<DateTime<Utc>>,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}
