//! Artwork and creator catalog - the persistent store the import pipeline
//! deduplicates against and writes into.
//!
//! Every write method is a single transaction, which is the unit of work
//! the per-record processor relies on.

mod sqlite;
mod types;

pub use sqlite::SqliteCatalog;
pub use types::*;

/// Trait for catalog storage.
pub trait CatalogStore: Send + Sync {
    /// Cheap connectivity probe, run once before a batch starts.
    fn health_check(&self) -> Result<(), CatalogError>;

    /// Artworks within `radius_m` meters of a point, nearest first.
    fn find_artworks_near(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
    ) -> Result<Vec<NearbyArtwork>, CatalogError>;

    /// Get an artwork by id, including linked creators.
    fn get_artwork(&self, id: &str) -> Result<Artwork, CatalogError>;

    /// Insert a new artwork.
    fn insert_artwork(&self, artwork: &NewArtwork) -> Result<Artwork, CatalogError>;

    /// Replace the tag set of an artwork.
    fn update_artwork_tags(&self, id: &str, tags: &Tags) -> Result<(), CatalogError>;

    /// Creators that could plausibly match a name or external reference.
    ///
    /// This is the creator-side pre-filter. Every exact external id match is
    /// returned, followed by at most `limit` loose name matches on the
    /// case-folded name, exact name matches first.
    fn find_creator_candidates(
        &self,
        name: &str,
        external_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Creator>, CatalogError>;

    /// Creators whose name equals one of `names` exactly (case-sensitive),
    /// in a single query.
    fn find_creators_by_names(&self, names: &[String]) -> Result<Vec<Creator>, CatalogError>;

    /// Insert several creators in one transaction.
    fn insert_creators(&self, creators: &[NewCreator]) -> Result<Vec<Creator>, CatalogError>;

    /// Link creators to an artwork. Existing links are left alone.
    ///
    /// Returns the number of new links.
    fn link_artwork_creators(
        &self,
        artwork_id: &str,
        creator_ids: &[String],
    ) -> Result<u32, CatalogError>;

    /// Get a creator by id.
    fn get_creator(&self, id: &str) -> Result<Creator, CatalogError>;

    /// Replace a creator's biography and tags.
    fn update_creator_profile(
        &self,
        id: &str,
        bio: Option<&str>,
        tags: &Tags,
    ) -> Result<(), CatalogError>;

    /// Get catalog statistics.
    fn stats(&self) -> Result<CatalogStats, CatalogError>;
}
