//! Per-record unit of work.
//!
//! A record moves through duplicate check, then either a tag/bio merge into
//! the existing entity or photo acquisition, catalog write and creator
//! resolution. Whatever goes wrong along the way, including a panic, ends as
//! a `failed` result for that record alone.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    ArtworkRecord, AutoCreatedCreator, CreatedArtwork, CreatedCreator, CreatorRecord,
    CreatorResolutionGap, DuplicateResult, FailedResult, ImportConfig, ImportRecord, ImportResult,
    RecordKind,
};
use crate::audit::{AuditEvent, AuditHandle};
use crate::catalog::{CatalogError, CatalogStore, EntityStatus, NewArtwork, NewCreator};
use crate::creators::{CreatorResolution, CreatorResolver, ResolveOptions};
use crate::dedup::merge::{merge_bio, merge_tags};
use crate::dedup::{ArtworkProbe, CreatorProbe, DuplicateDetector};
use crate::metrics;
use crate::photos::{PhotoAcquisition, PhotoPipeline};

/// Request-wide settings a record is processed under.
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    pub import_id: &'a str,
    pub system_user_id: &'a str,
    pub config: &'a ImportConfig,
}

/// Everything one record contributed to the response and audit trail.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub kind: RecordKind,
    pub result: ImportResult,
    pub auto_created: Vec<AutoCreatedCreator>,
    pub gap: Option<CreatorResolutionGap>,
    pub photos_downloaded: u32,
    pub photos_uploaded: u32,
    pub photos_failed: u32,
    /// 1 when tags were merged into a duplicate.
    pub tags_merged: u32,
    /// The record failed on a database-level catalog error.
    pub catalog_failure: bool,
}

impl RecordOutcome {
    fn new(kind: RecordKind, result: ImportResult) -> Self {
        Self {
            kind,
            result,
            auto_created: Vec::new(),
            gap: None,
            photos_downloaded: 0,
            photos_uploaded: 0,
            photos_failed: 0,
            tags_merged: 0,
            catalog_failure: false,
        }
    }

    fn failed(kind: RecordKind, index: usize, title: &str, reason: String) -> Self {
        Self::new(
            kind,
            ImportResult::Failed(FailedResult {
                index,
                title: title.to_string(),
                reason,
            }),
        )
    }

    fn outcome_label(&self) -> &'static str {
        match self.result {
            ImportResult::ArtworkCreated(_) | ImportResult::CreatorCreated(_) => "created",
            ImportResult::Duplicate(_) => "duplicate",
            ImportResult::Failed(_) => "failed",
        }
    }
}

/// Stage at which a record failed.
#[derive(Debug, Error)]
enum RecordFailure {
    #[error("duplicate check failed: {0}")]
    DuplicateCheck(CatalogError),
    #[error("catalog write failed: {0}")]
    Write(CatalogError),
}

impl RecordFailure {
    /// Failure of the catalog itself rather than of this record's data.
    fn is_database_error(&self) -> bool {
        match self {
            Self::DuplicateCheck(e) | Self::Write(e) => matches!(e, CatalogError::Database(_)),
        }
    }
}

/// Runs one record against the catalog.
pub struct RecordProcessor {
    catalog: Arc<dyn CatalogStore>,
    detector: DuplicateDetector,
    resolver: CreatorResolver,
    photos: PhotoPipeline,
    audit: Option<AuditHandle>,
}

impl RecordProcessor {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        search_radius_m: f64,
        photos: PhotoPipeline,
    ) -> Self {
        Self {
            detector: DuplicateDetector::new(Arc::clone(&catalog), search_radius_m),
            resolver: CreatorResolver::new(Arc::clone(&catalog)),
            catalog,
            photos,
            audit: None,
        }
    }

    /// Sets the audit handle for logging events.
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Process one record. Never fails; failures are part of the outcome.
    pub async fn process(
        &self,
        ctx: RecordContext<'_>,
        index: usize,
        record: &ImportRecord,
    ) -> RecordOutcome {
        let kind = record.kind();
        let work = async {
            match record {
                ImportRecord::Artwork(r) => self.process_artwork(ctx, index, r).await,
                ImportRecord::Creator(r) => self.process_creator(ctx, index, r).await,
            }
        };

        let outcome = match AssertUnwindSafe(work).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(failure)) => {
                warn!(
                    import_id = %ctx.import_id,
                    kind = kind.as_str(),
                    index,
                    error = %failure,
                    "Record failed"
                );
                let mut outcome =
                    RecordOutcome::failed(kind, index, record.title(), failure.to_string());
                outcome.catalog_failure = failure.is_database_error();
                outcome
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                warn!(
                    import_id = %ctx.import_id,
                    kind = kind.as_str(),
                    index,
                    panic = %reason,
                    "Record processing panicked"
                );
                RecordOutcome::failed(kind, index, record.title(), format!("internal error: {}", reason))
            }
        };

        if let ImportResult::Failed(failed) = &outcome.result {
            self.emit(AuditEvent::RecordFailed {
                import_id: ctx.import_id.to_string(),
                kind: kind.as_str().to_string(),
                index: index as u32,
                reason: failed.reason.clone(),
            })
            .await;
        }

        metrics::IMPORT_RECORDS_TOTAL
            .with_label_values(&[kind.as_str(), outcome.outcome_label()])
            .inc();

        outcome
    }

    async fn process_artwork(
        &self,
        ctx: RecordContext<'_>,
        index: usize,
        record: &ArtworkRecord,
    ) -> Result<RecordOutcome, RecordFailure> {
        let probe = ArtworkProbe {
            title: &record.title,
            lat: record.lat,
            lon: record.lon,
            creator: record.artist.as_deref(),
            external_id: record.external_id.as_deref(),
            tags: &record.tags,
        };

        let found = self
            .detector
            .detect_artwork(
                &probe,
                ctx.config.duplicate_threshold,
                &ctx.config.duplicate_weights,
            )
            .map_err(RecordFailure::DuplicateCheck)?;

        if let Some(found) = found {
            let mut new_tags_added = 0;
            let mut tags_merged = 0;
            if ctx.config.enable_tag_merging {
                let (merged, added) = merge_tags(&found.existing.tags, &record.tags);
                if added > 0 {
                    self.catalog
                        .update_artwork_tags(&found.existing.id, &merged)
                        .map_err(RecordFailure::Write)?;
                }
                new_tags_added = added;
                tags_merged = 1;
            }

            let duplicate = DuplicateResult {
                index,
                title: record.title.clone(),
                candidate: found.candidate,
                new_tags_added,
                bio_merged: false,
            };
            self.emit_duplicate(ctx, RecordKind::Artwork, &duplicate).await;

            let mut outcome = RecordOutcome::new(RecordKind::Artwork, ImportResult::Duplicate(duplicate));
            outcome.tags_merged = tags_merged;
            return Ok(outcome);
        }

        // Photos are fetched before the catalog write so no transaction spans the network.
        let acquisition = self.photos.acquire(&record.photos).await;
        self.emit_photo_failures(ctx, index, &acquisition).await;

        let new_artwork = NewArtwork {
            title: record.title.clone(),
            description: record.description.clone(),
            lat: record.lat,
            lon: record.lon,
            creator_names: record.artist.clone(),
            external_id: record.external_id.clone(),
            source: record.source.clone(),
            tags: record.tags.clone(),
            photos: acquisition.succeeded.clone(),
            status: EntityStatus::Approved,
            created_by: ctx.system_user_id.to_string(),
            import_id: Some(ctx.import_id.to_string()),
        };
        let artwork = self
            .catalog
            .insert_artwork(&new_artwork)
            .map_err(RecordFailure::Write)?;

        let resolution = match record.artist.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                let options = ResolveOptions {
                    create_missing: ctx.config.create_missing_artists,
                    auto_approve: ctx.config.auto_approve_artists,
                    created_by: ctx.system_user_id.to_string(),
                    import_id: Some(ctx.import_id.to_string()),
                };
                self.resolver.resolve(&artwork.id, raw, &options)
            }
            _ => CreatorResolution::default(),
        };

        let gap = resolution_gap(ctx.config, index, &artwork.id, &resolution);
        if let Some(gap) = &gap {
            warn!(
                import_id = %ctx.import_id,
                index,
                artwork_id = %artwork.id,
                names = ?gap.names,
                "Creator resolution incomplete: {}",
                gap.reason
            );
        }

        let auto_created: Vec<AutoCreatedCreator> = resolution
            .auto_created
            .iter()
            .map(|c| AutoCreatedCreator {
                id: c.id.clone(),
                name: c.name.clone(),
                source_artwork_id: artwork.id.clone(),
            })
            .collect();
        for creator in &auto_created {
            metrics::CREATORS_AUTO_CREATED.inc();
            self.emit(AuditEvent::CreatorAutoCreated {
                import_id: ctx.import_id.to_string(),
                creator_id: creator.id.clone(),
                name: creator.name.clone(),
                source_artwork_id: creator.source_artwork_id.clone(),
            })
            .await;
        }

        let creator_ids = resolution.creator_ids();
        self.emit(AuditEvent::ArtworkCreated {
            import_id: ctx.import_id.to_string(),
            artwork_id: artwork.id.clone(),
            index: index as u32,
            title: artwork.title.clone(),
            photos: acquisition.succeeded.len() as u32,
            creator_ids: creator_ids.clone(),
        })
        .await;
        info!(
            import_id = %ctx.import_id,
            index,
            artwork_id = %artwork.id,
            photos = acquisition.succeeded.len(),
            "Artwork created"
        );

        let photos_failed = acquisition.failed.len() as u32;
        let created = CreatedArtwork {
            index,
            id: artwork.id,
            title: artwork.title,
            creator_ids,
            photos: acquisition.succeeded,
            photo_errors: acquisition.failed,
        };

        let mut outcome = RecordOutcome::new(RecordKind::Artwork, ImportResult::ArtworkCreated(created));
        outcome.auto_created = auto_created;
        outcome.gap = gap;
        outcome.photos_downloaded = acquisition.downloaded;
        outcome.photos_uploaded = acquisition.uploaded;
        outcome.photos_failed = photos_failed;
        Ok(outcome)
    }

    async fn process_creator(
        &self,
        ctx: RecordContext<'_>,
        index: usize,
        record: &CreatorRecord,
    ) -> Result<RecordOutcome, RecordFailure> {
        let probe = CreatorProbe {
            name: &record.title,
            external_id: record.external_id.as_deref(),
        };

        let found = self
            .detector
            .detect_creator(
                &probe,
                ctx.config.duplicate_threshold,
                &ctx.config.duplicate_weights,
            )
            .map_err(RecordFailure::DuplicateCheck)?;

        if let Some(found) = found {
            let existing = &found.existing;
            let bio = merge_bio(existing.bio.as_deref(), record.description.as_deref());

            let (tags, new_tags_added, tags_merged) = if ctx.config.enable_tag_merging {
                let (merged, added) = merge_tags(&existing.tags, &record.tags);
                (merged, added, 1)
            } else {
                (existing.tags.clone(), 0, 0)
            };

            if bio.is_some() || new_tags_added > 0 {
                let bio_to_store = bio.as_deref().or(existing.bio.as_deref());
                self.catalog
                    .update_creator_profile(&existing.id, bio_to_store, &tags)
                    .map_err(RecordFailure::Write)?;
            }

            let duplicate = DuplicateResult {
                index,
                title: record.title.clone(),
                candidate: found.candidate,
                new_tags_added,
                bio_merged: bio.is_some(),
            };
            self.emit_duplicate(ctx, RecordKind::Creator, &duplicate).await;

            let mut outcome = RecordOutcome::new(RecordKind::Creator, ImportResult::Duplicate(duplicate));
            outcome.tags_merged = tags_merged;
            return Ok(outcome);
        }

        let new_creator = NewCreator {
            name: record.title.clone(),
            bio: record.description.clone(),
            external_id: record.external_id.clone(),
            birth_date: record.birth_date.clone(),
            death_date: record.death_date.clone(),
            website: record.website.clone(),
            tags: record.tags.clone(),
            status: EntityStatus::Approved,
            auto_created: false,
            source_artwork_id: None,
            created_by: ctx.system_user_id.to_string(),
        };

        let creator = self
            .catalog
            .insert_creators(std::slice::from_ref(&new_creator))
            .map_err(RecordFailure::Write)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                RecordFailure::Write(CatalogError::Internal("creator insert returned no row".to_string()))
            })?;

        self.emit(AuditEvent::CreatorCreated {
            import_id: ctx.import_id.to_string(),
            creator_id: creator.id.clone(),
            index: index as u32,
            name: creator.name.clone(),
        })
        .await;
        debug!(import_id = %ctx.import_id, index, creator_id = %creator.id, "Creator created");

        Ok(RecordOutcome::new(
            RecordKind::Creator,
            ImportResult::CreatorCreated(CreatedCreator {
                index,
                id: creator.id,
                name: creator.name,
            }),
        ))
    }

    async fn emit_duplicate(&self, ctx: RecordContext<'_>, kind: RecordKind, duplicate: &DuplicateResult) {
        debug!(
            import_id = %ctx.import_id,
            kind = kind.as_str(),
            index = duplicate.index,
            existing_id = %duplicate.candidate.existing_id,
            confidence = duplicate.candidate.confidence_score,
            "Duplicate detected"
        );
        self.emit(AuditEvent::DuplicateDetected {
            import_id: ctx.import_id.to_string(),
            kind: kind.as_str().to_string(),
            index: duplicate.index as u32,
            existing_id: duplicate.candidate.existing_id.clone(),
            confidence: duplicate.candidate.confidence_score,
            new_tags_added: duplicate.new_tags_added,
        })
        .await;
    }

    async fn emit_photo_failures(&self, ctx: RecordContext<'_>, index: usize, acquisition: &PhotoAcquisition) {
        for failure in &acquisition.failed {
            self.emit(AuditEvent::PhotoFailed {
                import_id: ctx.import_id.to_string(),
                index: index as u32,
                photo_index: failure.index as u32,
                url: failure.url.clone(),
                reason: failure.reason.clone(),
            })
            .await;
        }
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }
}

fn resolution_gap(
    config: &ImportConfig,
    index: usize,
    artwork_id: &str,
    resolution: &CreatorResolution,
) -> Option<CreatorResolutionGap> {
    if resolution.is_complete() {
        return None;
    }

    let reason = match &resolution.error {
        Some(error) => error.clone(),
        None if !config.create_missing_artists => "no matching creator".to_string(),
        None => "creator pending approval".to_string(),
    };

    Some(CreatorResolutionGap {
        index,
        artwork_id: artwork_id.to_string(),
        names: resolution.unresolved.clone(),
        reason,
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        Artwork, CatalogStats, Creator, NearbyArtwork, SqliteCatalog, Tags,
    };
    use crate::photos::PhotoFetcher;
    use crate::storage::ObjectStore;
    use crate::testing::{fixtures, MemoryObjectStore, MockPhotoFetcher};
    use serde_json::json;

    struct Harness {
        catalog: Arc<SqliteCatalog>,
        fetcher: Arc<MockPhotoFetcher>,
        processor: RecordProcessor,
    }

    fn harness() -> Harness {
        let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
        harness_with(Arc::clone(&catalog) as Arc<dyn CatalogStore>, catalog)
    }

    fn harness_with(store: Arc<dyn CatalogStore>, catalog: Arc<SqliteCatalog>) -> Harness {
        let fetcher = Arc::new(MockPhotoFetcher::new());
        let objects: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new("https://cdn.test"));
        let photos = PhotoPipeline::new(Arc::clone(&fetcher) as Arc<dyn PhotoFetcher>, objects, 3);
        Harness {
            catalog,
            fetcher,
            processor: RecordProcessor::new(store, 500.0, photos),
        }
    }

    fn ctx(config: &ImportConfig) -> RecordContext<'_> {
        RecordContext {
            import_id: "imp-1",
            system_user_id: "system-import",
            config,
        }
    }

    #[tokio::test]
    async fn test_new_artwork_is_created_with_system_attribution() {
        let h = harness();
        let config = ImportConfig::default();
        let record = ImportRecord::Artwork(fixtures::artwork_record("Untitled Mural", 49.28, -123.12));

        let outcome = h.processor.process(ctx(&config), 0, &record).await;

        let created = match outcome.result {
            ImportResult::ArtworkCreated(c) => c,
            other => panic!("expected created, got {:?}", other),
        };
        let stored = h.catalog.get_artwork(&created.id).unwrap();
        assert_eq!(stored.created_by, "system-import");
        assert_eq!(stored.import_id.as_deref(), Some("imp-1"));
        assert_eq!(stored.status, EntityStatus::Approved);
    }

    #[tokio::test]
    async fn test_resubmitted_artwork_is_duplicate_and_merges_tags() {
        let h = harness();
        let config = ImportConfig::default();
        let mut first = fixtures::artwork_record("Untitled Mural", 49.28, -123.12);
        first.tags = fixtures::tags(&[("medium", json!("paint"))]);
        h.processor
            .process(ctx(&config), 0, &ImportRecord::Artwork(first.clone()))
            .await;

        let mut second = first;
        second.tags = fixtures::tags(&[("medium", json!("spray")), ("year", json!(2019))]);
        let outcome = h
            .processor
            .process(ctx(&config), 0, &ImportRecord::Artwork(second))
            .await;

        let duplicate = match &outcome.result {
            ImportResult::Duplicate(d) => d.clone(),
            other => panic!("expected duplicate, got {:?}", other),
        };
        assert!(duplicate.candidate.confidence_score >= 0.7);
        assert_eq!(duplicate.new_tags_added, 1);
        assert_eq!(outcome.tags_merged, 1);

        let stored = h.catalog.get_artwork(&duplicate.candidate.existing_id).unwrap();
        assert_eq!(stored.tags.get("medium"), Some(&json!("paint")));
        assert_eq!(stored.tags.get("year"), Some(&json!(2019)));
    }

    #[tokio::test]
    async fn test_duplicate_without_tag_merging_leaves_tags() {
        let h = harness();
        let mut config = ImportConfig::default();
        let record = fixtures::artwork_record("Untitled Mural", 49.28, -123.12);
        h.processor
            .process(ctx(&config), 0, &ImportRecord::Artwork(record.clone()))
            .await;

        config.enable_tag_merging = false;
        let mut again = record;
        again.tags = fixtures::tags(&[("year", json!(2019))]);
        let outcome = h.processor.process(ctx(&config), 0, &ImportRecord::Artwork(again)).await;

        let duplicate = match &outcome.result {
            ImportResult::Duplicate(d) => d.clone(),
            other => panic!("expected duplicate, got {:?}", other),
        };
        assert_eq!(outcome.tags_merged, 0);
        let stored = h.catalog.get_artwork(&duplicate.candidate.existing_id).unwrap();
        assert!(stored.tags.is_empty());
    }

    #[tokio::test]
    async fn test_failed_photo_is_annotated_but_artwork_created() {
        let h = harness();
        let config = ImportConfig::default();
        h.fetcher
            .add_image("https://example.com/ok.png", fixtures::png_bytes(), "image/png")
            .await;
        let record = fixtures::artwork_with_photos(
            "Harbour Seal",
            49.3,
            -123.1,
            &["https://example.com/ok.png", "https://unreachable.invalid/x.jpg"],
        );

        let outcome = h
            .processor
            .process(ctx(&config), 4, &ImportRecord::Artwork(record))
            .await;

        let created = match &outcome.result {
            ImportResult::ArtworkCreated(c) => c.clone(),
            other => panic!("expected created, got {:?}", other),
        };
        assert_eq!(created.index, 4);
        assert_eq!(created.photos.len(), 1);
        assert_eq!(created.photo_errors.len(), 1);
        assert_eq!(created.photo_errors[0].index, 1);
        assert_eq!(outcome.photos_downloaded, 1);
        assert_eq!(outcome.photos_uploaded, 1);
        assert_eq!(outcome.photos_failed, 1);

        let stored = h.catalog.get_artwork(&created.id).unwrap();
        assert_eq!(stored.photos.len(), 1);
    }

    #[tokio::test]
    async fn test_artist_is_auto_created_and_linked() {
        let h = harness();
        let config = ImportConfig::default();
        let record = fixtures::artwork_with_artist("Totem", 49.3, -123.1, "John Smith, Jane Doe");

        let outcome = h
            .processor
            .process(ctx(&config), 0, &ImportRecord::Artwork(record))
            .await;

        let created = match &outcome.result {
            ImportResult::ArtworkCreated(c) => c.clone(),
            other => panic!("expected created, got {:?}", other),
        };
        assert_eq!(created.creator_ids.len(), 2);
        assert_eq!(outcome.auto_created.len(), 2);
        assert!(outcome.gap.is_none());
        assert!(outcome
            .auto_created
            .iter()
            .all(|c| c.source_artwork_id == created.id));

        let stored = h.catalog.get_artwork(&created.id).unwrap();
        assert_eq!(stored.creators.len(), 2);
    }

    #[tokio::test]
    async fn test_pending_stub_is_reported_as_gap() {
        let h = harness();
        let config = ImportConfig {
            auto_approve_artists: false,
            ..ImportConfig::default()
        };
        let record = fixtures::artwork_with_artist("Totem", 49.3, -123.1, "Smith, John");

        let outcome = h
            .processor
            .process(ctx(&config), 2, &ImportRecord::Artwork(record))
            .await;

        assert!(matches!(outcome.result, ImportResult::ArtworkCreated(_)));
        assert_eq!(outcome.auto_created.len(), 1);
        let gap = outcome.gap.expect("gap");
        assert_eq!(gap.index, 2);
        assert_eq!(gap.names, vec!["Smith, John".to_string()]);
        assert_eq!(gap.reason, "creator pending approval");
    }

    #[tokio::test]
    async fn test_missing_artist_without_creation_is_gap() {
        let h = harness();
        let config = ImportConfig {
            create_missing_artists: false,
            ..ImportConfig::default()
        };
        let record = fixtures::artwork_with_artist("Totem", 49.3, -123.1, "Emily Carr");

        let outcome = h
            .processor
            .process(ctx(&config), 0, &ImportRecord::Artwork(record))
            .await;

        assert!(outcome.auto_created.is_empty());
        assert_eq!(outcome.gap.expect("gap").reason, "no matching creator");
    }

    #[tokio::test]
    async fn test_new_creator_then_duplicate_merges_bio() {
        let h = harness();
        let config = ImportConfig::default();
        let mut record = fixtures::creator_record("Emily Carr");
        record.description = Some("Painter of the coast.".to_string());

        let first = h
            .processor
            .process(ctx(&config), 0, &ImportRecord::Creator(record.clone()))
            .await;
        let id = match first.result {
            ImportResult::CreatorCreated(c) => c.id,
            other => panic!("expected created, got {:?}", other),
        };

        record.description = Some("Also a writer.".to_string());
        let second = h
            .processor
            .process(ctx(&config), 1, &ImportRecord::Creator(record))
            .await;
        let duplicate = match second.result {
            ImportResult::Duplicate(d) => d,
            other => panic!("expected duplicate, got {:?}", other),
        };
        assert_eq!(duplicate.candidate.existing_id, id);
        assert!(duplicate.bio_merged);

        let stored = h.catalog.get_creator(&id).unwrap();
        let bio = stored.bio.unwrap();
        assert!(bio.starts_with("Painter of the coast."));
        assert!(bio.contains("## Additional Information"));
        assert!(bio.contains("Also a writer."));
    }

    /// Catalog whose writes always fail.
    struct BrokenWrites(SqliteCatalog);

    impl CatalogStore for BrokenWrites {
        fn health_check(&self) -> Result<(), CatalogError> {
            Ok(())
        }
        fn find_artworks_near(&self, lat: f64, lon: f64, r: f64) -> Result<Vec<NearbyArtwork>, CatalogError> {
            self.0.find_artworks_near(lat, lon, r)
        }
        fn get_artwork(&self, id: &str) -> Result<Artwork, CatalogError> {
            self.0.get_artwork(id)
        }
        fn insert_artwork(&self, _: &NewArtwork) -> Result<Artwork, CatalogError> {
            Err(CatalogError::Database("disk I/O error".to_string()))
        }
        fn update_artwork_tags(&self, _: &str, _: &Tags) -> Result<(), CatalogError> {
            Err(CatalogError::Database("disk I/O error".to_string()))
        }
        fn find_creator_candidates(&self, n: &str, e: Option<&str>, l: u32) -> Result<Vec<Creator>, CatalogError> {
            self.0.find_creator_candidates(n, e, l)
        }
        fn find_creators_by_names(&self, names: &[String]) -> Result<Vec<Creator>, CatalogError> {
            self.0.find_creators_by_names(names)
        }
        fn insert_creators(&self, _: &[NewCreator]) -> Result<Vec<Creator>, CatalogError> {
            Err(CatalogError::Database("disk I/O error".to_string()))
        }
        fn link_artwork_creators(&self, _: &str, _: &[String]) -> Result<u32, CatalogError> {
            Err(CatalogError::Database("disk I/O error".to_string()))
        }
        fn get_creator(&self, id: &str) -> Result<Creator, CatalogError> {
            self.0.get_creator(id)
        }
        fn update_creator_profile(&self, _: &str, _: Option<&str>, _: &Tags) -> Result<(), CatalogError> {
            Err(CatalogError::Database("disk I/O error".to_string()))
        }
        fn stats(&self) -> Result<CatalogStats, CatalogError> {
            self.0.stats()
        }
    }

    #[tokio::test]
    async fn test_write_failure_becomes_failed_result() {
        let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
        let broken: Arc<dyn CatalogStore> = Arc::new(BrokenWrites(SqliteCatalog::in_memory().unwrap()));
        let h = harness_with(broken, catalog);
        let config = ImportConfig::default();

        let outcome = h
            .processor
            .process(
                ctx(&config),
                7,
                &ImportRecord::Artwork(fixtures::artwork_record("Lost", 10.0, 10.0)),
            )
            .await;

        assert!(outcome.catalog_failure);
        match outcome.result {
            ImportResult::Failed(f) => {
                assert_eq!(f.index, 7);
                assert_eq!(f.title, "Lost");
                assert!(f.reason.starts_with("catalog write failed"));
            }
            other => panic!("expected failed, got {:?}", other),
        }
    }

    /// Catalog that panics on the duplicate pre-filter.
    struct PanickingCatalog(SqliteCatalog);

    impl CatalogStore for PanickingCatalog {
        fn health_check(&self) -> Result<(), CatalogError> {
            Ok(())
        }
        fn find_artworks_near(&self, _: f64, _: f64, _: f64) -> Result<Vec<NearbyArtwork>, CatalogError> {
            panic!("spatial index corrupted")
        }
        fn get_artwork(&self, id: &str) -> Result<Artwork, CatalogError> {
            self.0.get_artwork(id)
        }
        fn insert_artwork(&self, a: &NewArtwork) -> Result<Artwork, CatalogError> {
            self.0.insert_artwork(a)
        }
        fn update_artwork_tags(&self, id: &str, t: &Tags) -> Result<(), CatalogError> {
            self.0.update_artwork_tags(id, t)
        }
        fn find_creator_candidates(&self, n: &str, e: Option<&str>, l: u32) -> Result<Vec<Creator>, CatalogError> {
            self.0.find_creator_candidates(n, e, l)
        }
        fn find_creators_by_names(&self, names: &[String]) -> Result<Vec<Creator>, CatalogError> {
            self.0.find_creators_by_names(names)
        }
        fn insert_creators(&self, c: &[NewCreator]) -> Result<Vec<Creator>, CatalogError> {
            self.0.insert_creators(c)
        }
        fn link_artwork_creators(&self, a: &str, c: &[String]) -> Result<u32, CatalogError> {
            self.0.link_artwork_creators(a, c)
        }
        fn get_creator(&self, id: &str) -> Result<Creator, CatalogError> {
            self.0.get_creator(id)
        }
        fn update_creator_profile(&self, id: &str, b: Option<&str>, t: &Tags) -> Result<(), CatalogError> {
            self.0.update_creator_profile(id, b, t)
        }
        fn stats(&self) -> Result<CatalogStats, CatalogError> {
            self.0.stats()
        }
    }

    #[tokio::test]
    async fn test_panic_is_isolated_to_the_record() {
        let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
        let panicking: Arc<dyn CatalogStore> = Arc::new(PanickingCatalog(SqliteCatalog::in_memory().unwrap()));
        let h = harness_with(panicking, catalog);
        let config = ImportConfig::default();

        let outcome = h
            .processor
            .process(
                ctx(&config),
                0,
                &ImportRecord::Artwork(fixtures::artwork_record("Boom", 1.0, 1.0)),
            )
            .await;

        match outcome.result {
            ImportResult::Failed(f) => assert!(f.reason.contains("spatial index corrupted")),
            other => panic!("expected failed, got {:?}", other),
        }
    }
}
