//! Prometheus metrics for the import pipeline.
//!
//! Import batches, per-record outcomes, photo acquisition and duplicate
//! scoring. The server registers everything from [`all_metrics`].

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Import batches
// =============================================================================

/// Import batches by result.
pub static IMPORT_BATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mosaic_import_batches_total", "Total import batches"),
        &["result"], // "completed", "rejected", "timed_out", "unavailable"
    )
    .unwrap()
});

/// Import batch duration in seconds.
pub static IMPORT_BATCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mosaic_import_batch_duration_seconds",
            "Wall-clock duration of an import batch",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

/// Records processed by kind and outcome.
pub static IMPORT_RECORDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mosaic_import_records_total", "Total imported records"),
        &["kind", "outcome"], // outcome: "created", "duplicate", "failed"
    )
    .unwrap()
});

/// Creator stubs created while linking artworks.
pub static CREATORS_AUTO_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mosaic_creators_auto_created_total",
        "Creators created automatically from artwork attributions",
    )
    .unwrap()
});

// =============================================================================
// Photos
// =============================================================================

pub static PHOTOS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mosaic_photos_total", "Total photo acquisitions"),
        &["result"], // "stored", "failed"
    )
    .unwrap()
});

/// Bytes written to object storage.
pub static PHOTO_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("mosaic_photo_bytes_total", "Total photo bytes stored").unwrap()
});

// =============================================================================
// Duplicate detection
// =============================================================================

/// Confidence of the best candidate per detection, whether or not it matched.
pub static DUPLICATE_CONFIDENCE: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mosaic_duplicate_confidence",
            "Distribution of best duplicate candidate scores",
        )
        .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 1.0]),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(IMPORT_BATCHES_TOTAL.clone()),
        Box::new(IMPORT_BATCH_DURATION.clone()),
        Box::new(IMPORT_RECORDS_TOTAL.clone()),
        Box::new(CREATORS_AUTO_CREATED.clone()),
        Box::new(PHOTOS_TOTAL.clone()),
        Box::new(PHOTO_BYTES.clone()),
        Box::new(DUPLICATE_CONFIDENCE.clone()),
    ]
}
