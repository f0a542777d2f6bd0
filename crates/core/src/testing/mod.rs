//! Test doubles for the network and storage seams of the import pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use mosaic_core::testing::{fixtures, MemoryObjectStore, MockPhotoFetcher};
//!
//! let fetcher = MockPhotoFetcher::new();
//! fetcher.add_image("https://example.com/a.png", fixtures::png_bytes(), "image/png").await;
//! let store = MemoryObjectStore::new("https://cdn.test");
//! ```

mod memory_object_store;
mod mock_photo_fetcher;

pub use memory_object_store::{MemoryObjectStore, StoredObject};
pub use mock_photo_fetcher::{MockPhotoFetcher, MockPhotoResponse, RecordedFetch};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;
    use serde_json::{json, Value};

    use crate::catalog::{EntityStatus, NewArtwork, NewCreator, Tags};
    use crate::import::{ArtworkRecord, CreatorRecord, ImportConfig, ImportData, ImportRequest, ImportSource};
    use crate::photos::PhotoRef;

    /// A complete 1x1 transparent PNG.
    pub fn png_bytes() -> Vec<u8> {
        vec![
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
            0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00,
            0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78,
            0x9C, 0x63, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00,
            0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
        ]
    }

    /// JPEG/JFIF header followed by filler; enough for magic-byte sniffing.
    pub fn jpeg_bytes() -> Vec<u8> {
        let mut bytes = vec![
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00,
            0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
        ];
        bytes.extend_from_slice(&[0u8; 32]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    pub fn tags(pairs: &[(&str, Value)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// An artwork record without creator or photos.
    pub fn artwork_record(title: &str, lat: f64, lon: f64) -> ArtworkRecord {
        ArtworkRecord {
            title: title.to_string(),
            description: None,
            artist: None,
            lat,
            lon,
            source: "osm".to_string(),
            external_id: None,
            tags: Tags::new(),
            photos: Vec::new(),
        }
    }

    pub fn artwork_with_artist(title: &str, lat: f64, lon: f64, artist: &str) -> ArtworkRecord {
        ArtworkRecord {
            artist: Some(artist.to_string()),
            ..artwork_record(title, lat, lon)
        }
    }

    pub fn artwork_with_photos(title: &str, lat: f64, lon: f64, urls: &[&str]) -> ArtworkRecord {
        ArtworkRecord {
            photos: urls.iter().map(|u| PhotoRef::new(*u)).collect(),
            ..artwork_record(title, lat, lon)
        }
    }

    pub fn creator_record(name: &str) -> CreatorRecord {
        CreatorRecord {
            title: name.to_string(),
            description: None,
            source: "wikidata".to_string(),
            external_id: None,
            tags: Tags::new(),
            birth_date: None,
            death_date: None,
            website: None,
        }
    }

    /// A request with default config.
    pub fn import_request(
        import_id: &str,
        artworks: Vec<ArtworkRecord>,
        artists: Vec<CreatorRecord>,
    ) -> ImportRequest {
        ImportRequest {
            import_id: import_id.to_string(),
            source: ImportSource {
                plugin_name: "test-plugin".to_string(),
                original_data_source: "fixtures".to_string(),
                import_timestamp: Utc::now(),
            },
            config: ImportConfig::default(),
            data: ImportData { artworks, artists },
        }
    }

    /// The wire form of a minimal valid request with one artwork.
    pub fn request_json(import_id: &str) -> Value {
        json!({
            "importId": import_id,
            "source": {
                "pluginName": "test-plugin",
                "originalDataSource": "fixtures",
                "importTimestamp": "2024-05-01T12:00:00Z"
            },
            "data": {
                "artworks": [
                    {"title": "Harbour Mural", "lat": 49.2827, "lon": -123.1207, "source": "osm"}
                ]
            }
        })
    }

    /// An approved artwork ready for direct insertion.
    pub fn new_artwork(title: &str, lat: f64, lon: f64) -> NewArtwork {
        NewArtwork {
            title: title.to_string(),
            description: None,
            lat,
            lon,
            creator_names: None,
            external_id: None,
            source: "seed".to_string(),
            tags: Tags::new(),
            photos: Vec::new(),
            status: EntityStatus::Approved,
            created_by: "seed".to_string(),
            import_id: None,
        }
    }

    /// An approved creator ready for direct insertion.
    pub fn new_creator(name: &str) -> NewCreator {
        NewCreator {
            name: name.to_string(),
            bio: None,
            external_id: None,
            birth_date: None,
            death_date: None,
            website: None,
            tags: Tags::new(),
            status: EntityStatus::Approved,
            auto_created: false,
            source_artwork_id: None,
            created_by: "seed".to_string(),
        }
    }
}
