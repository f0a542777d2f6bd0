//! Similarity signals and weighted scoring.
//!
//! Every signal is in [0, 1]; a [`ScoreBreakdown`] holds each signal
//! multiplied by its weight.

use std::collections::BTreeSet;

use super::{ArtworkProbe, CreatorProbe, DuplicateWeights, ScoreBreakdown};
use crate::catalog::{Artwork, Creator, Tags};
use crate::creators::split_creator_names;

/// Lowercase, drop punctuation, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized form with words sorted, so "Smith, John" equals "John Smith".
fn sorted_words(s: &str) -> String {
    let normalized = normalize_text(s);
    let mut words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
    words.sort_unstable();
    words.join(" ")
}

/// Normalized Levenshtein similarity of two texts.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

/// Similarity of two person names, insensitive to word order.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let direct = text_similarity(a, b);
    let a = sorted_words(a);
    let b = sorted_words(b);
    if a.is_empty() || b.is_empty() {
        return direct;
    }
    direct.max(strsim::normalized_levenshtein(&a, &b))
}

/// Linear decay from 1 at the same point to 0 at the search radius.
pub fn geo_proximity(distance_m: f64, radius_m: f64) -> f64 {
    if radius_m <= 0.0 || !distance_m.is_finite() || distance_m >= radius_m {
        return 0.0;
    }
    (1.0 - distance_m / radius_m).clamp(0.0, 1.0)
}

/// Jaccard index of two sets; 0 when both are empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// 1 when both references are present and equal after trimming.
pub fn external_id_match(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a.map(str::trim), b.map(str::trim)) {
        (Some(a), Some(b)) if !a.is_empty() && a == b => 1.0,
        _ => 0.0,
    }
}

/// Creator names of a free-text field, normalized for comparison.
pub fn creator_name_set(raw: &str) -> BTreeSet<String> {
    split_creator_names(raw)
        .iter()
        .map(|n| sorted_words(n))
        .filter(|n| !n.is_empty())
        .collect()
}

/// Tags as normalized `key:value` pairs.
pub fn tag_pairs(tags: &Tags) -> BTreeSet<String> {
    tags.iter()
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s.trim().to_lowercase(),
                other => other.to_string(),
            };
            format!("{}:{}", k.trim().to_lowercase(), value)
        })
        .collect()
}

fn existing_creator_set(existing: &Artwork) -> BTreeSet<String> {
    match existing.creator_names.as_deref() {
        Some(raw) if !raw.trim().is_empty() => creator_name_set(raw),
        _ => existing
            .creators
            .iter()
            .map(|c| sorted_words(&c.name))
            .filter(|n| !n.is_empty())
            .collect(),
    }
}

/// Score an incoming artwork against an existing one at `distance_m`.
pub fn score_artwork(
    probe: &ArtworkProbe<'_>,
    existing: &Artwork,
    distance_m: f64,
    radius_m: f64,
    weights: &DuplicateWeights,
) -> ScoreBreakdown {
    let artist = match probe.creator {
        Some(raw) => jaccard(&creator_name_set(raw), &existing_creator_set(existing)),
        None => 0.0,
    };

    ScoreBreakdown {
        gps: weights.gps * geo_proximity(distance_m, radius_m),
        title: weights.title * text_similarity(probe.title, &existing.title),
        artist: weights.artist * artist,
        reference_ids: weights.reference_ids
            * external_id_match(probe.external_id, existing.external_id.as_deref()),
        tag_similarity: weights.tag_similarity
            * jaccard(&tag_pairs(probe.tags), &tag_pairs(&existing.tags)),
        creator_name: 0.0,
    }
}

/// Score an incoming creator against an existing one. No geographic signal.
pub fn score_creator(
    probe: &CreatorProbe<'_>,
    existing: &Creator,
    weights: &DuplicateWeights,
) -> ScoreBreakdown {
    ScoreBreakdown {
        creator_name: weights.creator_name * name_similarity(probe.name, &existing.name),
        reference_ids: weights.reference_ids
            * external_id_match(probe.external_id, existing.external_id.as_deref()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CreatorRef, EntityStatus};
    use chrono::Utc;
    use serde_json::json;

    fn existing_artwork(title: &str) -> Artwork {
        Artwork {
            id: "art-1".to_string(),
            title: title.to_string(),
            description: None,
            lat: 49.28,
            lon: -123.12,
            creator_names: None,
            creators: Vec::new(),
            external_id: None,
            source: "test".to_string(),
            tags: Tags::new(),
            photos: Vec::new(),
            status: EntityStatus::Approved,
            created_by: "system".to_string(),
            import_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  The   Blue-Heron! "), "the blue heron");
        assert_eq!(normalize_text("..."), "");
    }

    #[test]
    fn test_text_similarity() {
        assert_eq!(text_similarity("Untitled Mural", "untitled mural"), 1.0);
        assert_eq!(text_similarity("", "anything"), 0.0);
        let close = text_similarity("blue heron", "blue herons");
        assert!(close > 0.9 && close < 1.0);
    }

    #[test]
    fn test_name_similarity_ignores_word_order() {
        assert_eq!(name_similarity("Smith, John", "John Smith"), 1.0);
        assert!(name_similarity("Jane Doe", "John Smith") < 0.5);
    }

    #[test]
    fn test_geo_proximity() {
        assert_eq!(geo_proximity(0.0, 500.0), 1.0);
        assert!((geo_proximity(250.0, 500.0) - 0.5).abs() < 1e-9);
        assert_eq!(geo_proximity(500.0, 500.0), 0.0);
        assert_eq!(geo_proximity(900.0, 500.0), 0.0);
    }

    #[test]
    fn test_jaccard() {
        let a: BTreeSet<&str> = ["a", "b"].into_iter().collect();
        let b: BTreeSet<&str> = ["b", "c"].into_iter().collect();
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(jaccard::<&str>(&BTreeSet::new(), &BTreeSet::new()), 0.0);
    }

    #[test]
    fn test_external_id_match() {
        assert_eq!(external_id_match(Some("Q1"), Some(" Q1 ")), 1.0);
        assert_eq!(external_id_match(Some("Q1"), Some("Q2")), 0.0);
        assert_eq!(external_id_match(None, Some("Q1")), 0.0);
        assert_eq!(external_id_match(Some(""), Some("")), 0.0);
    }

    #[test]
    fn test_tag_pairs_normalize_strings() {
        let mut a = Tags::new();
        a.insert("Material".to_string(), json!("Bronze "));
        let mut b = Tags::new();
        b.insert("material".to_string(), json!("bronze"));
        assert_eq!(tag_pairs(&a), tag_pairs(&b));
    }

    #[test]
    fn test_same_artwork_scores_high() {
        let existing = existing_artwork("Untitled Mural");
        let tags = Tags::new();
        let probe = ArtworkProbe {
            title: "Untitled Mural",
            lat: 49.28,
            lon: -123.12,
            creator: None,
            external_id: None,
            tags: &tags,
        };

        let breakdown = score_artwork(&probe, &existing, 0.0, 500.0, &DuplicateWeights::default());
        assert!((breakdown.gps - 0.6).abs() < 1e-9);
        assert!((breakdown.title - 0.25).abs() < 1e-9);
        assert!(breakdown.confidence() > 0.84);
    }

    #[test]
    fn test_artist_overlap_uses_linked_creators() {
        let mut existing = existing_artwork("Totem");
        existing.creators = vec![CreatorRef {
            id: "c-1".to_string(),
            name: "Bill Reid".to_string(),
        }];
        let tags = Tags::new();
        let probe = ArtworkProbe {
            title: "Totem",
            lat: 0.0,
            lon: 0.0,
            creator: Some("Reid, Bill"),
            external_id: None,
            tags: &tags,
        };

        let breakdown = score_artwork(&probe, &existing, 10.0, 500.0, &DuplicateWeights::default());
        assert!((breakdown.artist - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_external_id_with_weak_title_crosses_threshold() {
        let mut existing = existing_artwork("blue herons");
        existing.external_id = Some("osm:123".to_string());
        let weights = DuplicateWeights {
            gps: 0.0,
            artist: 0.0,
            tag_similarity: 0.0,
            ..Default::default()
        };
        let tags = Tags::new();

        let with_ref = ArtworkProbe {
            title: "blue heron",
            lat: 0.0,
            lon: 0.0,
            creator: None,
            external_id: Some("osm:123"),
            tags: &tags,
        };
        let title_only = ArtworkProbe {
            external_id: None,
            ..with_ref
        };
        let ref_only = ArtworkProbe {
            title: "something else entirely",
            ..with_ref
        };

        let combined = score_artwork(&with_ref, &existing, 0.0, 500.0, &weights).confidence();
        let title_score = score_artwork(&title_only, &existing, 0.0, 500.0, &weights).confidence();
        let ref_score = score_artwork(&ref_only, &existing, 0.0, 500.0, &weights).confidence();

        assert!(combined >= 0.7, "combined {combined}");
        assert!(title_score < 0.7);
        assert!(ref_score < 0.7);
    }

    #[test]
    fn test_creator_score_identical_name_crosses_default_threshold() {
        let existing = Creator {
            id: "c-1".to_string(),
            name: "Emily Carr".to_string(),
            bio: None,
            external_id: None,
            birth_date: None,
            death_date: None,
            website: None,
            tags: Tags::new(),
            status: EntityStatus::Approved,
            auto_created: false,
            source_artwork_id: None,
            created_by: "system".to_string(),
            created_at: Utc::now(),
        };
        let probe = CreatorProbe {
            name: "Carr, Emily",
            external_id: None,
        };

        let breakdown = score_creator(&probe, &existing, &DuplicateWeights::default());
        assert_eq!(breakdown.gps, 0.0);
        assert!(breakdown.confidence() >= 0.7);
    }
}
