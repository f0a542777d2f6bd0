//! Batch orchestration of an import request.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::processor::{RecordContext, RecordOutcome, RecordProcessor};
use super::{validate_request, ImportError, ImportRequest, ImportResponse};
use crate::audit::{AuditEvent, AuditHandle};
use crate::catalog::{CatalogError, CatalogStore};
use crate::config::ImportSettings;
use crate::metrics;
use crate::photos::{PhotoFetcher, PhotoPipeline};
use crate::storage::ObjectStore;

/// Runs whole import requests against the catalog.
///
/// Records are processed one at a time, artworks first, under a single
/// wall-clock budget. The budget is checked before each record starts;
/// a record already in flight always runs to completion.
pub struct ImportService {
    catalog: Arc<dyn CatalogStore>,
    processor: RecordProcessor,
    settings: ImportSettings,
    time_budget: Duration,
    audit: Option<AuditHandle>,
}

impl ImportService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        fetcher: Arc<dyn PhotoFetcher>,
        objects: Arc<dyn ObjectStore>,
        settings: ImportSettings,
    ) -> Self {
        let photos = PhotoPipeline::new(fetcher, objects, settings.photo_workers);
        Self {
            processor: RecordProcessor::new(Arc::clone(&catalog), settings.search_radius_m, photos),
            catalog,
            time_budget: Duration::from_secs(settings.time_budget_secs),
            settings,
            audit: None,
        }
    }

    /// Sets the audit handle for logging events.
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.processor = self.processor.with_audit(audit.clone());
        self.audit = Some(audit);
        self
    }

    /// Overrides the budget taken from settings.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    /// Validate a raw request body and import it.
    ///
    /// Validation failures reject the request before anything is written.
    pub async fn run(&self, body: &Value) -> Result<ImportResponse, ImportError> {
        let request = match validate_request(body) {
            Ok(request) => request,
            Err(errors) => {
                let import_id = body
                    .get("importId")
                    .and_then(Value::as_str)
                    .map(String::from);
                warn!(
                    import_id = ?import_id,
                    errors = errors.len(),
                    "Import request rejected"
                );
                metrics::IMPORT_BATCHES_TOTAL
                    .with_label_values(&["rejected"])
                    .inc();
                self.emit(AuditEvent::ImportRejected {
                    import_id,
                    user_id: self.settings.system_user_id.clone(),
                    error_count: errors.len() as u32,
                    fields: errors.errors.iter().map(|e| e.field.clone()).collect(),
                })
                .await;
                return Err(errors.into());
            }
        };

        self.import(request).await
    }

    /// Import an already validated request.
    pub async fn import(&self, request: ImportRequest) -> Result<ImportResponse, ImportError> {
        let started = Instant::now();
        let deadline = started + self.time_budget;
        let system_user_id = self.settings.system_user_id.as_str();
        let import_id = request.import_id.clone();

        if let Err(e) = self.catalog.health_check() {
            error!(import_id = %import_id, error = %e, "Catalog unavailable, import aborted");
            metrics::IMPORT_BATCHES_TOTAL
                .with_label_values(&["unavailable"])
                .inc();
            return Err(ImportError::CatalogUnavailable {
                reason: e.to_string(),
                partial: None,
            });
        }

        let total = request.data.total();
        self.emit(AuditEvent::ImportStarted {
            import_id: import_id.clone(),
            user_id: system_user_id.to_string(),
            plugin_name: request.source.plugin_name.clone(),
            original_data_source: request.source.original_data_source.clone(),
            artworks: request.data.artworks.len() as u32,
            artists: request.data.artists.len() as u32,
        })
        .await;
        info!(
            import_id = %import_id,
            plugin = %request.source.plugin_name,
            artworks = request.data.artworks.len(),
            artists = request.data.artists.len(),
            "Import started"
        );

        let mut response = ImportResponse::new(&import_id, total, system_user_id);
        let config = request.config;
        let ctx = RecordContext {
            import_id: &import_id,
            system_user_id,
            config: &config,
        };

        let records = request.data.into_records();
        let batch_size = config.batch_size.max(1);

        for (batch_no, batch) in records.chunks(batch_size).enumerate() {
            if Instant::now() >= deadline {
                return Err(self.time_out(response, total, started).await);
            }
            response.audit_trail.batches_processed += 1;
            info!(
                import_id = %import_id,
                batch = batch_no + 1,
                records = batch.len(),
                "Processing batch"
            );

            for (index, record) in batch {
                if Instant::now() >= deadline {
                    return Err(self.time_out(response, total, started).await);
                }
                let outcome = self.processor.process(ctx, *index, record).await;
                let catalog_failure = outcome.catalog_failure;
                apply_outcome(&mut response, outcome);

                if catalog_failure {
                    if let Err(e) = self.catalog.health_check() {
                        return Err(self.abort(response, total, started, e).await);
                    }
                }
            }
        }

        response.audit_trail.finish();
        let elapsed = started.elapsed();
        let summary = &response.summary;
        info!(
            import_id = %import_id,
            processed = summary.total_processed,
            succeeded = summary.total_succeeded,
            duplicates = summary.total_duplicates,
            failed = summary.total_failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Import completed"
        );
        self.emit(AuditEvent::ImportCompleted {
            import_id: import_id.clone(),
            user_id: system_user_id.to_string(),
            total_processed: summary.total_processed,
            total_succeeded: summary.total_succeeded,
            total_failed: summary.total_failed,
            total_duplicates: summary.total_duplicates,
            duration_ms: elapsed.as_millis() as u64,
        })
        .await;
        metrics::IMPORT_BATCHES_TOTAL
            .with_label_values(&["completed"])
            .inc();
        metrics::IMPORT_BATCH_DURATION
            .with_label_values(&["completed"])
            .observe(elapsed.as_secs_f64());

        Ok(response)
    }

    async fn time_out(&self, mut response: ImportResponse, total: usize, started: Instant) -> ImportError {
        response.audit_trail.finish();
        let processed = response.summary.total_processed;
        let remaining = (total as u32).saturating_sub(processed);
        let budget_secs = self.time_budget.as_secs();

        warn!(
            import_id = %response.import_id,
            processed,
            remaining,
            budget_secs,
            "Import time budget exhausted"
        );
        self.emit(AuditEvent::ImportTimedOut {
            import_id: response.import_id.clone(),
            user_id: self.settings.system_user_id.clone(),
            processed,
            remaining,
            budget_secs,
        })
        .await;
        metrics::IMPORT_BATCHES_TOTAL
            .with_label_values(&["timed_out"])
            .inc();
        metrics::IMPORT_BATCH_DURATION
            .with_label_values(&["timed_out"])
            .observe(started.elapsed().as_secs_f64());

        ImportError::BudgetExceeded {
            budget_secs,
            processed,
            partial: Box::new(response),
        }
    }

    async fn abort(
        &self,
        mut response: ImportResponse,
        total: usize,
        started: Instant,
        cause: CatalogError,
    ) -> ImportError {
        response.audit_trail.finish();
        let processed = response.summary.total_processed;
        let remaining = (total as u32).saturating_sub(processed);
        let reason = cause.to_string();

        error!(
            import_id = %response.import_id,
            processed,
            remaining,
            error = %reason,
            "Catalog lost mid-import, remaining records not started"
        );
        self.emit(AuditEvent::ImportAborted {
            import_id: response.import_id.clone(),
            user_id: self.settings.system_user_id.clone(),
            processed,
            remaining,
            reason: reason.clone(),
        })
        .await;
        metrics::IMPORT_BATCHES_TOTAL
            .with_label_values(&["unavailable"])
            .inc();
        metrics::IMPORT_BATCH_DURATION
            .with_label_values(&["unavailable"])
            .observe(started.elapsed().as_secs_f64());

        ImportError::CatalogUnavailable {
            reason,
            partial: Some(Box::new(response)),
        }
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }
}

fn apply_outcome(response: &mut ImportResponse, outcome: RecordOutcome) {
    let trail = &mut response.audit_trail;
    trail.tags_merged += outcome.tags_merged;
    trail.photos_downloaded += outcome.photos_downloaded;
    trail.photos_uploaded += outcome.photos_uploaded;
    trail.photos_failed += outcome.photos_failed;
    trail.creators_auto_created += outcome.auto_created.len() as u32;
    if let Some(gap) = outcome.gap {
        trail.creator_resolution_gaps.push(gap);
    }

    response
        .results
        .artists
        .auto_created
        .extend(outcome.auto_created);
    response.record(outcome.kind, outcome.result);
}
