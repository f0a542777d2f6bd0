//! SQLite-backed catalog implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};
use uuid::Uuid;

use super::{
    Artwork, CatalogError, CatalogStats, CatalogStore, Creator, CreatorRef, EntityStatus,
    NearbyArtwork, NewArtwork, NewCreator, Tags,
};
use crate::dedup::scoring::normalize_text;
use crate::geo::{haversine_m, BoundingBox};
use crate::photos::ProcessedPhoto;

const ARTWORK_COLUMNS: &str = "id, title, description, lat, lon, creator_names, external_id, \
     source, tags, photos, status, created_by, import_id, created_at";

const CREATOR_COLUMNS: &str = "id, name, bio, external_id, birth_date, death_date, website, \
     tags, status, auto_created, source_artwork_id, created_by, created_at";

/// SQLite-backed catalog.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Create a new SQLite catalog, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS artworks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                lat REAL NOT NULL,
                lon REAL NOT NULL,
                creator_names TEXT,
                external_id TEXT,
                source TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '{}',
                photos TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL,
                created_by TEXT NOT NULL,
                import_id TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_artworks_lat_lon ON artworks(lat, lon);
            CREATE INDEX IF NOT EXISTS idx_artworks_external_id ON artworks(external_id);

            CREATE TABLE IF NOT EXISTS creators (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                name_key TEXT NOT NULL,
                bio TEXT,
                external_id TEXT,
                birth_date TEXT,
                death_date TEXT,
                website TEXT,
                tags TEXT NOT NULL DEFAULT '{}',
                status TEXT NOT NULL,
                auto_created INTEGER NOT NULL DEFAULT 0,
                source_artwork_id TEXT,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_creators_name ON creators(name);
            CREATE INDEX IF NOT EXISTS idx_creators_name_key ON creators(name_key);
            CREATE INDEX IF NOT EXISTS idx_creators_external_id ON creators(external_id);

            CREATE TABLE IF NOT EXISTS artwork_creators (
                artwork_id TEXT NOT NULL REFERENCES artworks(id) ON DELETE CASCADE,
                creator_id TEXT NOT NULL REFERENCES creators(id) ON DELETE CASCADE,
                role TEXT NOT NULL DEFAULT 'artist',
                created_at TEXT NOT NULL,
                PRIMARY KEY (artwork_id, creator_id)
            );

            CREATE INDEX IF NOT EXISTS idx_artwork_creators_creator ON artwork_creators(creator_id);
            "#,
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Internal("catalog connection lock poisoned".to_string()))
    }

    fn parse_timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn encode_tags(tags: &Tags) -> Result<String, CatalogError> {
        serde_json::to_string(tags).map_err(|e| CatalogError::Internal(e.to_string()))
    }

    /// Convert a row to Artwork (without linked creators).
    fn row_to_artwork(row: &rusqlite::Row) -> rusqlite::Result<Artwork> {
        let tags_json: String = row.get(8)?;
        let photos_json: String = row.get(9)?;
        let status: String = row.get(10)?;
        let created_at: String = row.get(13)?;

        let tags: Tags = serde_json::from_str(&tags_json).unwrap_or_default();
        let photos: Vec<ProcessedPhoto> = serde_json::from_str(&photos_json).unwrap_or_default();

        Ok(Artwork {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            lat: row.get(3)?,
            lon: row.get(4)?,
            creator_names: row.get(5)?,
            creators: Vec::new(), // Will be loaded separately
            external_id: row.get(6)?,
            source: row.get(7)?,
            tags,
            photos,
            status: EntityStatus::parse(&status),
            created_by: row.get(11)?,
            import_id: row.get(12)?,
            created_at: Self::parse_timestamp(&created_at),
        })
    }

    fn row_to_creator(row: &rusqlite::Row) -> rusqlite::Result<Creator> {
        let tags_json: String = row.get(7)?;
        let status: String = row.get(8)?;
        let created_at: String = row.get(12)?;

        Ok(Creator {
            id: row.get(0)?,
            name: row.get(1)?,
            bio: row.get(2)?,
            external_id: row.get(3)?,
            birth_date: row.get(4)?,
            death_date: row.get(5)?,
            website: row.get(6)?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            status: EntityStatus::parse(&status),
            auto_created: row.get(9)?,
            source_artwork_id: row.get(10)?,
            created_by: row.get(11)?,
            created_at: Self::parse_timestamp(&created_at),
        })
    }

    /// Load the creators linked to an artwork.
    fn load_creator_refs(
        conn: &Connection,
        artwork_id: &str,
    ) -> Result<Vec<CreatorRef>, CatalogError> {
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name FROM artwork_creators ac
             JOIN creators c ON c.id = ac.creator_id
             WHERE ac.artwork_id = ?
             ORDER BY ac.created_at, c.name",
        )?;

        let rows = stmt.query_map(params![artwork_id], |row| {
            Ok(CreatorRef {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut refs = Vec::new();
        for row in rows {
            refs.push(row?);
        }
        Ok(refs)
    }

    /// Longest word of a normalized name, escaped for use in a LIKE pattern
    /// against `name_key`.
    fn name_search_pattern(name_key: &str) -> Option<String> {
        let token = name_key
            .split(' ')
            .filter(|t| t.chars().count() > 1)
            .max_by_key(|t| t.chars().count())?;

        let escaped = token
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{}%", escaped))
    }
}

impl CatalogStore for SqliteCatalog {
    fn health_check(&self) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    fn find_artworks_near(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
    ) -> Result<Vec<NearbyArtwork>, CatalogError> {
        let conn = self.lock()?;
        let bbox = BoundingBox::around(lat, lon, radius_m);

        let [(min_lon_a, max_lon_a), (min_lon_b, max_lon_b)] = bbox.lon_ranges();

        let sql = format!(
            "SELECT {} FROM artworks
             WHERE lat BETWEEN ?1 AND ?2
               AND (lon BETWEEN ?3 AND ?4 OR lon BETWEEN ?5 AND ?6)",
            ARTWORK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![bbox.min_lat, bbox.max_lat, min_lon_a, max_lon_a, min_lon_b, max_lon_b],
            Self::row_to_artwork,
        )?;

        let mut nearby = Vec::new();
        for row in rows {
            let mut artwork = row?;
            // The box is a superset of the circle
            let distance_m = haversine_m(lat, lon, artwork.lat, artwork.lon);
            if distance_m > radius_m {
                continue;
            }
            artwork.creators = Self::load_creator_refs(&conn, &artwork.id)?;
            nearby.push(NearbyArtwork {
                artwork,
                distance_m,
            });
        }

        nearby.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        Ok(nearby)
    }

    fn get_artwork(&self, id: &str) -> Result<Artwork, CatalogError> {
        let conn = self.lock()?;

        let sql = format!("SELECT {} FROM artworks WHERE id = ?", ARTWORK_COLUMNS);
        let mut artwork = conn
            .query_row(&sql, params![id], Self::row_to_artwork)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => CatalogError::NotFound(id.to_string()),
                _ => CatalogError::Database(e.to_string()),
            })?;

        artwork.creators = Self::load_creator_refs(&conn, id)?;
        Ok(artwork)
    }

    fn insert_artwork(&self, artwork: &NewArtwork) -> Result<Artwork, CatalogError> {
        let conn = self.lock()?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let photos_json = serde_json::to_string(&artwork.photos)
            .map_err(|e| CatalogError::Internal(e.to_string()))?;

        conn.execute(
            "INSERT INTO artworks (id, title, description, lat, lon, creator_names, external_id,
                                   source, tags, photos, status, created_by, import_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                &id,
                &artwork.title,
                &artwork.description,
                artwork.lat,
                artwork.lon,
                &artwork.creator_names,
                &artwork.external_id,
                &artwork.source,
                Self::encode_tags(&artwork.tags)?,
                photos_json,
                artwork.status.as_str(),
                &artwork.created_by,
                &artwork.import_id,
                now.to_rfc3339(),
            ],
        )?;

        Ok(Artwork {
            id,
            title: artwork.title.clone(),
            description: artwork.description.clone(),
            lat: artwork.lat,
            lon: artwork.lon,
            creator_names: artwork.creator_names.clone(),
            creators: Vec::new(),
            external_id: artwork.external_id.clone(),
            source: artwork.source.clone(),
            tags: artwork.tags.clone(),
            photos: artwork.photos.clone(),
            status: artwork.status,
            created_by: artwork.created_by.clone(),
            import_id: artwork.import_id.clone(),
            created_at: now,
        })
    }

    fn update_artwork_tags(&self, id: &str, tags: &Tags) -> Result<(), CatalogError> {
        let conn = self.lock()?;

        let rows_affected = conn.execute(
            "UPDATE artworks SET tags = ? WHERE id = ?",
            params![Self::encode_tags(tags)?, id],
        )?;

        if rows_affected == 0 {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn find_creator_candidates(
        &self,
        name: &str,
        external_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Creator>, CatalogError> {
        let name_key = normalize_text(name);
        let pattern = Self::name_search_pattern(&name_key);
        let external_id = external_id.filter(|s| !s.trim().is_empty());
        if pattern.is_none() && external_id.is_none() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut creators: Vec<Creator> = Vec::new();

        if let Some(external_id) = external_id {
            let sql = format!(
                "SELECT {} FROM creators WHERE external_id = ?1 ORDER BY created_at DESC",
                CREATOR_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![external_id], Self::row_to_creator)?;
            for row in rows {
                creators.push(row?);
            }
        }

        if let Some(pattern) = pattern {
            let sql = format!(
                "SELECT {} FROM creators
                 WHERE name_key LIKE ?1 ESCAPE '\\'
                 ORDER BY name_key = ?2 DESC, created_at DESC
                 LIMIT ?3",
                CREATOR_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![pattern, name_key, limit as i64],
                Self::row_to_creator,
            )?;
            for row in rows {
                let creator = row?;
                if !creators.iter().any(|c| c.id == creator.id) {
                    creators.push(creator);
                }
            }
        }

        Ok(creators)
    }

    fn find_creators_by_names(&self, names: &[String]) -> Result<Vec<Creator>, CatalogError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM creators WHERE name IN ({}) ORDER BY created_at",
            CREATOR_COLUMNS, placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(names.iter()), Self::row_to_creator)?;

        let mut creators = Vec::new();
        for row in rows {
            creators.push(row?);
        }
        Ok(creators)
    }

    fn insert_creators(&self, creators: &[NewCreator]) -> Result<Vec<Creator>, CatalogError> {
        if creators.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let mut inserted = Vec::with_capacity(creators.len());

        for creator in creators {
            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO creators (id, name, name_key, bio, external_id, birth_date, death_date,
                                       website, tags, status, auto_created, source_artwork_id,
                                       created_by, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    &id,
                    &creator.name,
                    normalize_text(&creator.name),
                    &creator.bio,
                    &creator.external_id,
                    &creator.birth_date,
                    &creator.death_date,
                    &creator.website,
                    Self::encode_tags(&creator.tags)?,
                    creator.status.as_str(),
                    creator.auto_created,
                    &creator.source_artwork_id,
                    &creator.created_by,
                    &now_str,
                ],
            )?;

            inserted.push(Creator {
                id,
                name: creator.name.clone(),
                bio: creator.bio.clone(),
                external_id: creator.external_id.clone(),
                birth_date: creator.birth_date.clone(),
                death_date: creator.death_date.clone(),
                website: creator.website.clone(),
                tags: creator.tags.clone(),
                status: creator.status,
                auto_created: creator.auto_created,
                source_artwork_id: creator.source_artwork_id.clone(),
                created_by: creator.created_by.clone(),
                created_at: now,
            });
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn link_artwork_creators(
        &self,
        artwork_id: &str,
        creator_ids: &[String],
    ) -> Result<u32, CatalogError> {
        if creator_ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now_str = Utc::now().to_rfc3339();
        let mut linked = 0u32;

        for creator_id in creator_ids {
            linked += tx.execute(
                "INSERT OR IGNORE INTO artwork_creators (artwork_id, creator_id, role, created_at)
                 VALUES (?, ?, 'artist', ?)",
                params![artwork_id, creator_id, &now_str],
            )? as u32;
        }

        tx.commit()?;
        Ok(linked)
    }

    fn get_creator(&self, id: &str) -> Result<Creator, CatalogError> {
        let conn = self.lock()?;

        let sql = format!("SELECT {} FROM creators WHERE id = ?", CREATOR_COLUMNS);
        conn.query_row(&sql, params![id], Self::row_to_creator)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => CatalogError::NotFound(id.to_string()),
                _ => CatalogError::Database(e.to_string()),
            })
    }

    fn update_creator_profile(
        &self,
        id: &str,
        bio: Option<&str>,
        tags: &Tags,
    ) -> Result<(), CatalogError> {
        let conn = self.lock()?;

        let rows_affected = conn.execute(
            "UPDATE creators SET bio = ?, tags = ? WHERE id = ?",
            params![bio, Self::encode_tags(tags)?, id],
        )?;

        if rows_affected == 0 {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let conn = self.lock()?;

        let total_artworks: u64 =
            conn.query_row("SELECT COUNT(*) FROM artworks", [], |row| row.get(0))?;

        let total_creators: u64 =
            conn.query_row("SELECT COUNT(*) FROM creators", [], |row| row.get(0))?;

        let auto_created_creators: u64 = conn.query_row(
            "SELECT COUNT(*) FROM creators WHERE auto_created = 1",
            [],
            |row| row.get(0),
        )?;

        let artwork_creator_links: u64 =
            conn.query_row("SELECT COUNT(*) FROM artwork_creators", [], |row| row.get(0))?;

        let newest_artwork: Option<DateTime<Utc>> = conn
            .query_row("SELECT MAX(created_at) FROM artworks", [], |row| {
                let s: Option<String> = row.get(0)?;
                Ok(s)
            })?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(CatalogStats {
            total_artworks,
            total_creators,
            auto_created_creators,
            artwork_creator_links,
            newest_artwork,
        })
    }
}
