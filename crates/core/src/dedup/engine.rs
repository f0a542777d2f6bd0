//! Duplicate detection against the catalog.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::scoring::{score_artwork, score_creator};
use super::{
    ArtworkProbe, CreatorProbe, DuplicateCandidate, DuplicateMatch, DuplicateWeights,
    ScoreBreakdown,
};
use crate::catalog::{Artwork, CatalogError, CatalogStore, Creator};
use crate::metrics;

/// Upper bound on creators fetched by the name pre-filter.
const CREATOR_CANDIDATE_LIMIT: u32 = 50;

/// Finds the best existing match for an incoming record.
pub struct DuplicateDetector {
    catalog: Arc<dyn CatalogStore>,
    search_radius_m: f64,
}

impl DuplicateDetector {
    pub fn new(catalog: Arc<dyn CatalogStore>, search_radius_m: f64) -> Self {
        Self {
            catalog,
            search_radius_m,
        }
    }

    /// Best-scoring artwork within the search radius, if it reaches `threshold`.
    ///
    /// Artworks outside the radius are never considered.
    pub fn detect_artwork(
        &self,
        probe: &ArtworkProbe<'_>,
        threshold: f64,
        weights: &DuplicateWeights,
    ) -> Result<Option<DuplicateMatch<Artwork>>, CatalogError> {
        let nearby = self
            .catalog
            .find_artworks_near(probe.lat, probe.lon, self.search_radius_m)?;

        debug!(
            candidates = nearby.len(),
            radius_m = self.search_radius_m,
            "Scoring nearby artworks"
        );

        let scored = nearby.into_iter().map(|n| {
            let breakdown = score_artwork(
                probe,
                &n.artwork,
                n.distance_m,
                self.search_radius_m,
                weights,
            );
            (n.artwork.id.clone(), n.artwork.created_at, breakdown, n.artwork)
        });

        Ok(select_best(scored, threshold, "artwork"))
    }

    /// Best-scoring creator by name and external reference, if it reaches `threshold`.
    pub fn detect_creator(
        &self,
        probe: &CreatorProbe<'_>,
        threshold: f64,
        weights: &DuplicateWeights,
    ) -> Result<Option<DuplicateMatch<Creator>>, CatalogError> {
        let candidates = self.catalog.find_creator_candidates(
            probe.name,
            probe.external_id,
            CREATOR_CANDIDATE_LIMIT,
        )?;

        let scored = candidates.into_iter().map(|c| {
            let breakdown = score_creator(probe, &c, weights);
            (c.id.clone(), c.created_at, breakdown, c)
        });

        Ok(select_best(scored, threshold, "creator"))
    }
}

/// Highest confidence wins; ties go to the most recently created record.
fn select_best<T>(
    scored: impl Iterator<Item = (String, DateTime<Utc>, ScoreBreakdown, T)>,
    threshold: f64,
    kind: &str,
) -> Option<DuplicateMatch<T>> {
    let mut best: Option<(f64, DateTime<Utc>, String, ScoreBreakdown, T)> = None;

    for (id, created_at, breakdown, entity) in scored {
        let confidence = breakdown.confidence();
        let better = match &best {
            None => true,
            Some((best_score, best_created, ..)) => {
                confidence > *best_score
                    || (confidence == *best_score && created_at > *best_created)
            }
        };
        if better {
            best = Some((confidence, created_at, id, breakdown, entity));
        }
    }

    let (confidence, _, existing_id, score_breakdown, existing) = best?;
    metrics::DUPLICATE_CONFIDENCE
        .with_label_values(&[kind])
        .observe(confidence);
    if confidence < threshold {
        return None;
    }

    Some(DuplicateMatch {
        candidate: DuplicateCandidate {
            existing_id,
            confidence_score: confidence,
            score_breakdown,
        },
        existing,
    })
}
