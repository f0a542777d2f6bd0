//! Request, result and audit types of a mass import.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Tags;
use crate::dedup::{DuplicateCandidate, DuplicateWeights};
use crate::photos::{PhotoFailure, PhotoRef, ProcessedPhoto};

/// Hard cap on records (artworks plus artists) in one request.
pub const MAX_BATCH_SIZE: usize = 500;

/// Cap on photos attached to one artwork record.
pub const MAX_PHOTOS_PER_RECORD: usize = 10;

pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.7;

/// A validated import request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    /// Caller-chosen id, used for logging and audit only.
    pub import_id: String,
    pub source: ImportSource,
    #[serde(default)]
    pub config: ImportConfig,
    pub data: ImportData,
}

/// Where the records came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSource {
    pub plugin_name: String,
    pub original_data_source: String,
    pub import_timestamp: DateTime<Utc>,
}

/// Per-request processing options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    pub duplicate_threshold: f64,
    pub duplicate_weights: DuplicateWeights,
    /// Records handled per batch; a request may span several batches.
    pub batch_size: usize,
    pub enable_tag_merging: bool,
    pub create_missing_artists: bool,
    pub auto_approve_artists: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            duplicate_weights: DuplicateWeights::default(),
            batch_size: MAX_BATCH_SIZE,
            enable_tag_merging: true,
            create_missing_artists: true,
            auto_approve_artists: true,
        }
    }
}

/// The records of a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportData {
    pub artworks: Vec<ArtworkRecord>,
    pub artists: Vec<CreatorRecord>,
}

impl ImportData {
    pub fn total(&self) -> usize {
        self.artworks.len() + self.artists.len()
    }

    /// Artworks first, then artists, each group in input order.
    ///
    /// The index is the position within the record's own group.
    pub fn into_records(self) -> Vec<(usize, ImportRecord)> {
        let artworks = self
            .artworks
            .into_iter()
            .enumerate()
            .map(|(i, r)| (i, ImportRecord::Artwork(r)));
        let artists = self
            .artists
            .into_iter()
            .enumerate()
            .map(|(i, r)| (i, ImportRecord::Creator(r)));
        artworks.chain(artists).collect()
    }
}

/// An incoming artwork.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkRecord {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-text creator field: one name or a comma-separated list.
    #[serde(default, alias = "creator", skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub photos: Vec<PhotoRef>,
}

/// An incoming creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorRecord {
    /// Display name.
    #[serde(alias = "name")]
    pub title: String,
    /// Biography.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// A single incoming record of either kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportRecord {
    Artwork(ArtworkRecord),
    Creator(CreatorRecord),
}

impl ImportRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Artwork(_) => RecordKind::Artwork,
            Self::Creator(_) => RecordKind::Creator,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Artwork(r) => &r.title,
            Self::Creator(r) => &r.title,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Artwork,
    Creator,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artwork => "artwork",
            Self::Creator => "creator",
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// A newly created artwork.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedArtwork {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub creator_ids: Vec<String>,
    pub photos: Vec<ProcessedPhoto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photo_errors: Vec<PhotoFailure>,
}

/// A newly created creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCreator {
    pub index: usize,
    pub id: String,
    pub name: String,
}

/// A creator stub made to satisfy an artwork's creator field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCreatedCreator {
    pub id: String,
    pub name: String,
    pub source_artwork_id: String,
}

/// A record that matched an existing entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateResult {
    pub index: usize,
    pub title: String,
    #[serde(flatten)]
    pub candidate: DuplicateCandidate,
    /// Tag keys appended to the existing entity.
    pub new_tags_added: u32,
    /// Biography text appended to the existing creator.
    #[serde(default)]
    pub bio_merged: bool,
}

/// A record that could not be processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedResult {
    pub index: usize,
    pub title: String,
    pub reason: String,
}

/// Outcome of one record.
#[derive(Debug, Clone)]
pub enum ImportResult {
    ArtworkCreated(CreatedArtwork),
    CreatorCreated(CreatedCreator),
    Duplicate(DuplicateResult),
    Failed(FailedResult),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkResults {
    pub created: Vec<CreatedArtwork>,
    pub duplicates: Vec<DuplicateResult>,
    pub failed: Vec<FailedResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorResults {
    pub created: Vec<CreatedCreator>,
    pub auto_created: Vec<AutoCreatedCreator>,
    pub duplicates: Vec<DuplicateResult>,
    pub failed: Vec<FailedResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResults {
    pub artworks: ArtworkResults,
    pub artists: CreatorResults,
}

/// Batch-level counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_requested: u32,
    /// Records that reached a result (created, duplicate or failed).
    pub total_processed: u32,
    /// Records created as new entities.
    pub total_succeeded: u32,
    pub total_failed: u32,
    pub total_duplicates: u32,
}

/// Creator names of an artwork that could not be linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorResolutionGap {
    pub index: usize,
    pub artwork_id: String,
    pub names: Vec<String>,
    pub reason: String,
}

/// What the pipeline did during one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrail {
    pub batches_processed: u32,
    /// Duplicate merges performed.
    pub tags_merged: u32,
    pub photos_downloaded: u32,
    pub photos_uploaded: u32,
    pub photos_failed: u32,
    pub creators_auto_created: u32,
    #[serde(default)]
    pub creator_resolution_gaps: Vec<CreatorResolutionGap>,
    pub system_user_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl AuditTrail {
    pub fn start(system_user_id: &str) -> Self {
        Self {
            batches_processed: 0,
            tags_merged: 0,
            photos_downloaded: 0,
            photos_uploaded: 0,
            photos_failed: 0,
            creators_auto_created: 0,
            creator_resolution_gaps: Vec::new(),
            system_user_id: system_user_id.to_string(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }
}

/// Response of an import request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub import_id: String,
    pub summary: ImportSummary,
    pub results: ImportResults,
    pub audit_trail: AuditTrail,
}

impl ImportResponse {
    pub fn new(import_id: &str, total_requested: usize, system_user_id: &str) -> Self {
        Self {
            import_id: import_id.to_string(),
            summary: ImportSummary {
                total_requested: total_requested as u32,
                ..Default::default()
            },
            results: ImportResults::default(),
            audit_trail: AuditTrail::start(system_user_id),
        }
    }

    /// Record the result of one record under its kind.
    pub fn record(&mut self, kind: RecordKind, result: ImportResult) {
        self.summary.total_processed += 1;
        match result {
            ImportResult::ArtworkCreated(created) => {
                self.summary.total_succeeded += 1;
                self.results.artworks.created.push(created);
            }
            ImportResult::CreatorCreated(created) => {
                self.summary.total_succeeded += 1;
                self.results.artists.created.push(created);
            }
            ImportResult::Duplicate(duplicate) => {
                self.summary.total_duplicates += 1;
                match kind {
                    RecordKind::Artwork => self.results.artworks.duplicates.push(duplicate),
                    RecordKind::Creator => self.results.artists.duplicates.push(duplicate),
                }
            }
            ImportResult::Failed(failed) => {
                self.summary.total_failed += 1;
                match kind {
                    RecordKind::Artwork => self.results.artworks.failed.push(failed),
                    RecordKind::Creator => self.results.artists.failed.push(failed),
                }
            }
        }
    }
}
