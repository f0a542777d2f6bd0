//! Types for duplicate detection.

use serde::{Deserialize, Serialize};

use crate::catalog::Tags;

/// Per-signal weights. They need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuplicateWeights {
    /// Geographic proximity.
    pub gps: f64,
    /// Title similarity.
    pub title: f64,
    /// Creator-name overlap between artworks.
    pub artist: f64,
    /// Exact external reference match.
    pub reference_ids: f64,
    /// Tag-set similarity.
    pub tag_similarity: f64,
    /// Name similarity between creators.
    pub creator_name: f64,
}

impl Default for DuplicateWeights {
    fn default() -> Self {
        Self {
            gps: 0.6,
            title: 0.25,
            artist: 0.2,
            reference_ids: 0.5,
            tag_similarity: 0.05,
            creator_name: 0.9,
        }
    }
}

/// Weighted contribution of each signal to a confidence score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub gps: f64,
    pub title: f64,
    pub artist: f64,
    pub reference_ids: f64,
    pub tag_similarity: f64,
    pub creator_name: f64,
}

impl ScoreBreakdown {
    /// Sum of contributions, clamped to [0, 1].
    pub fn confidence(&self) -> f64 {
        let total = self.gps
            + self.title
            + self.artist
            + self.reference_ids
            + self.tag_similarity
            + self.creator_name;
        if total.is_nan() {
            return 0.0;
        }
        total.clamp(0.0, 1.0)
    }
}

/// Best existing match for a candidate. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCandidate {
    pub existing_id: String,
    pub confidence_score: f64,
    pub score_breakdown: ScoreBreakdown,
}

/// A duplicate together with the existing entity it matched.
#[derive(Debug, Clone)]
pub struct DuplicateMatch<T> {
    pub candidate: DuplicateCandidate,
    pub existing: T,
}

/// The fields of an incoming artwork that take part in scoring.
#[derive(Debug, Clone, Copy)]
pub struct ArtworkProbe<'a> {
    pub title: &'a str,
    pub lat: f64,
    pub lon: f64,
    pub creator: Option<&'a str>,
    pub external_id: Option<&'a str>,
    pub tags: &'a Tags,
}

/// The fields of an incoming creator that take part in scoring.
#[derive(Debug, Clone, Copy)]
pub struct CreatorProbe<'a> {
    pub name: &'a str,
    pub external_id: Option<&'a str>,
}
