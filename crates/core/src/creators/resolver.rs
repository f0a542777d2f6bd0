//! Resolution of an artwork's creator field to creator entities.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::split_creator_names;
use crate::catalog::{CatalogStore, Creator, CreatorRef, EntityStatus, NewCreator, Tags};

/// How missing creators are handled.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Insert stubs for names with no existing creator.
    pub create_missing: bool,
    /// Stubs are approved on creation and linked right away.
    pub auto_approve: bool,
    /// Identity stubs are attributed to.
    pub created_by: String,
    /// Import the stubs were created by, recorded as a tag.
    pub import_id: Option<String>,
}

/// Outcome of resolving one artwork's creators.
///
/// Resolution never fails outright: whatever could not be resolved or
/// linked is described by `unresolved` and `error`.
#[derive(Debug, Clone, Default)]
pub struct CreatorResolution {
    /// Creators linked to the artwork, in name order.
    pub linked: Vec<CreatorRef>,
    /// Stubs inserted for this artwork.
    pub auto_created: Vec<Creator>,
    /// Names that ended up without a link.
    pub unresolved: Vec<String>,
    /// First catalog error hit, if any.
    pub error: Option<String>,
}

impl CreatorResolution {
    /// True when every name was linked without error.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && self.error.is_none()
    }

    pub fn creator_ids(&self) -> Vec<String> {
        self.linked.iter().map(|c| c.id.clone()).collect()
    }
}

/// Maps free-text creator fields to creator entities, creating stubs.
pub struct CreatorResolver {
    catalog: Arc<dyn CatalogStore>,
}

impl CreatorResolver {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Resolve `raw` for an already-written artwork and link the results.
    ///
    /// Lookup, stub insertion and linking are one catalog call each.
    pub fn resolve(&self, artwork_id: &str, raw: &str, options: &ResolveOptions) -> CreatorResolution {
        let mut resolution = CreatorResolution::default();
        let names = split_creator_names(raw);
        if names.is_empty() {
            return resolution;
        }

        let existing = match self.catalog.find_creators_by_names(&names) {
            Ok(found) => found,
            Err(e) => {
                warn!(artwork_id = %artwork_id, error = %e, "Creator lookup failed");
                resolution.unresolved = names;
                resolution.error = Some(e.to_string());
                return resolution;
            }
        };

        // Oldest creator wins when several share a name
        let mut by_name: HashMap<&str, &Creator> = HashMap::new();
        for creator in &existing {
            by_name.entry(creator.name.as_str()).or_insert(creator);
        }

        let missing: Vec<&String> = names
            .iter()
            .filter(|n| !by_name.contains_key(n.as_str()))
            .collect();

        let mut stubs: Vec<Creator> = Vec::new();
        if !missing.is_empty() && options.create_missing {
            let new_creators: Vec<NewCreator> = missing
                .iter()
                .map(|name| Self::stub_for(name, artwork_id, options))
                .collect();

            match self.catalog.insert_creators(&new_creators) {
                Ok(inserted) => {
                    debug!(artwork_id = %artwork_id, count = inserted.len(), "Auto-created creators");
                    stubs = inserted;
                }
                Err(e) => {
                    warn!(artwork_id = %artwork_id, error = %e, "Creator stub insert failed");
                    resolution.error = Some(e.to_string());
                }
            }
        }

        let stub_by_name: HashMap<&str, &Creator> =
            stubs.iter().map(|c| (c.name.as_str(), c)).collect();

        let mut to_link: Vec<CreatorRef> = Vec::new();
        for name in &names {
            let creator = by_name
                .get(name.as_str())
                .copied()
                .or_else(|| stub_by_name.get(name.as_str()).copied());

            match creator {
                Some(c) if c.status == EntityStatus::Approved => to_link.push(CreatorRef {
                    id: c.id.clone(),
                    name: c.name.clone(),
                }),
                _ => resolution.unresolved.push(name.clone()),
            }
        }

        if !to_link.is_empty() {
            let ids: Vec<String> = to_link.iter().map(|c| c.id.clone()).collect();
            match self.catalog.link_artwork_creators(artwork_id, &ids) {
                Ok(_) => resolution.linked = to_link,
                Err(e) => {
                    warn!(artwork_id = %artwork_id, error = %e, "Creator linking failed");
                    resolution
                        .unresolved
                        .extend(to_link.into_iter().map(|c| c.name));
                    resolution.error.get_or_insert(e.to_string());
                }
            }
        }

        resolution.auto_created = stubs;
        resolution
    }

    fn stub_for(name: &str, artwork_id: &str, options: &ResolveOptions) -> NewCreator {
        let mut tags = Tags::new();
        tags.insert("auto_created".to_string(), serde_json::Value::Bool(true));
        if let Some(import_id) = &options.import_id {
            tags.insert(
                "import_id".to_string(),
                serde_json::Value::String(import_id.clone()),
            );
        }

        NewCreator {
            name: name.to_string(),
            tags,
            status: if options.auto_approve {
                EntityStatus::Approved
            } else {
                EntityStatus::Pending
            },
            auto_created: true,
            source_artwork_id: Some(artwork_id.to_string()),
            created_by: options.created_by.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewArtwork, SqliteCatalog};

    fn options() -> ResolveOptions {
        ResolveOptions {
            create_missing: true,
            auto_approve: true,
            created_by: "system".to_string(),
            import_id: Some("imp-1".to_string()),
        }
    }

    fn setup() -> (Arc<SqliteCatalog>, String) {
        let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
        let artwork = catalog
            .insert_artwork(&NewArtwork {
                title: "Mural".to_string(),
                description: None,
                lat: 0.0,
                lon: 0.0,
                creator_names: None,
                external_id: None,
                source: "test".to_string(),
                tags: Tags::new(),
                photos: Vec::new(),
                status: EntityStatus::Approved,
                created_by: "system".to_string(),
                import_id: None,
            })
            .unwrap();
        (catalog, artwork.id)
    }

    #[test]
    fn test_last_first_resolves_to_one_creator() {
        let (catalog, artwork_id) = setup();
        let resolver = CreatorResolver::new(catalog.clone());

        let resolution = resolver.resolve(&artwork_id, "Smith, John", &options());

        assert!(resolution.is_complete());
        assert_eq!(resolution.linked.len(), 1);
        assert_eq!(resolution.linked[0].name, "Smith, John");
        assert_eq!(resolution.auto_created.len(), 1);
        assert!(resolution.auto_created[0].auto_created);
        assert_eq!(
            resolution.auto_created[0].source_artwork_id.as_deref(),
            Some(artwork_id.as_str())
        );
    }

    #[test]
    fn test_two_full_names_resolve_to_two_creators() {
        let (catalog, artwork_id) = setup();
        let resolver = CreatorResolver::new(catalog.clone());

        let resolution = resolver.resolve(&artwork_id, "John Smith, Jane Doe", &options());

        let names: Vec<&str> = resolution.linked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["John Smith", "Jane Doe"]);
        assert_eq!(catalog.get_artwork(&artwork_id).unwrap().creators.len(), 2);
    }

    #[test]
    fn test_paired_names_resolve_to_two_creators() {
        let (catalog, artwork_id) = setup();
        let resolver = CreatorResolver::new(catalog);

        let resolution = resolver.resolve(&artwork_id, "Smith, John, Doe, Jane", &options());

        let names: Vec<&str> = resolution.linked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Smith, John", "Doe, Jane"]);
    }

    #[test]
    fn test_existing_creator_is_reused() {
        let (catalog, artwork_id) = setup();
        let existing = catalog
            .insert_creators(&[NewCreator {
                name: "Jane Doe".to_string(),
                created_by: "someone".to_string(),
                ..Default::default()
            }])
            .unwrap()
            .remove(0);
        let resolver = CreatorResolver::new(catalog.clone());

        let resolution = resolver.resolve(&artwork_id, "Jane Doe, John Roe", &options());

        assert_eq!(resolution.linked[0].id, existing.id);
        assert_eq!(resolution.auto_created.len(), 1);
        assert_eq!(resolution.auto_created[0].name, "John Roe");
        assert_eq!(catalog.stats().unwrap().total_creators, 2);
    }

    #[test]
    fn test_no_create_reports_unresolved() {
        let (catalog, artwork_id) = setup();
        let resolver = CreatorResolver::new(catalog.clone());
        let mut opts = options();
        opts.create_missing = false;

        let resolution = resolver.resolve(&artwork_id, "Nobody Known", &opts);

        assert!(!resolution.is_complete());
        assert_eq!(resolution.unresolved, vec!["Nobody Known"]);
        assert!(resolution.error.is_none());
        assert_eq!(catalog.stats().unwrap().total_creators, 0);
    }

    #[test]
    fn test_pending_stubs_are_not_linked() {
        let (catalog, artwork_id) = setup();
        let resolver = CreatorResolver::new(catalog.clone());
        let mut opts = options();
        opts.auto_approve = false;

        let resolution = resolver.resolve(&artwork_id, "Pending Person", &opts);

        assert!(resolution.linked.is_empty());
        assert_eq!(resolution.auto_created.len(), 1);
        assert_eq!(resolution.auto_created[0].status, EntityStatus::Pending);
        assert_eq!(resolution.unresolved, vec!["Pending Person"]);
    }

    #[test]
    fn test_link_failure_is_reported_not_raised() {
        let (catalog, _) = setup();
        let resolver = CreatorResolver::new(catalog);

        // Foreign key violation: the artwork does not exist
        let resolution = resolver.resolve("missing-artwork", "Jane Doe", &options());

        assert!(resolution.linked.is_empty());
        assert!(resolution.error.is_some());
        assert_eq!(resolution.unresolved, vec!["Jane Doe"]);
    }

    #[test]
    fn test_empty_field_resolves_nothing() {
        let (catalog, artwork_id) = setup();
        let resolver = CreatorResolver::new(catalog);

        let resolution = resolver.resolve(&artwork_id, "  ", &options());
        assert!(resolution.is_complete());
        assert!(resolution.linked.is_empty());
    }
}
