use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::domain::{CatalogEntry, Category};

/// In-memory view of every loaded entry.
///
/// Readers always see a complete list: a reload swaps the shared snapshot
/// in a single write.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: RwLock<Arc<Vec<CatalogEntry>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole catalog, sorted by name.
    pub fn replace(&self, mut entries: Vec<CatalogEntry>) {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let snapshot = Arc::new(entries);
        match self.entries.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<CatalogEntry>> {
        match self.entries.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// `None` means every category ("All").
    pub fn for_category(&self, category: Option<Category>) -> Vec<CatalogEntry> {
        self.filtered(|entry| category.is_none_or(|category| entry.category == category))
    }

    pub fn weekly_features(&self) -> Vec<CatalogEntry> {
        self.filtered(|entry| entry.is_weekly_feature)
    }

    pub fn community_highlights(&self) -> Vec<CatalogEntry> {
        self.filtered(|entry| entry.is_community_highlight)
    }

    /// Entries that are not shipped with the application.
    pub fn user_entries(&self) -> Vec<CatalogEntry> {
        self.filtered(|entry| !entry.is_built_in)
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<CatalogEntry> {
        self.snapshot().iter().find(|entry| entry.id() == id).cloned()
    }

    /// Case-insensitive name lookup.
    pub fn find_by_name(&self, name: &str) -> Option<CatalogEntry> {
        let needle = name.trim().to_lowercase();
        self.snapshot()
            .iter()
            .find(|entry| entry.name.to_lowercase() == needle)
            .cloned()
    }

    /// Resolves either an id or a name.
    pub fn lookup(&self, key: &str) -> Option<CatalogEntry> {
        match Uuid::parse_str(key.trim()) {
            Ok(id) => self.find_by_id(id),
            Err(_) => self.find_by_name(key),
        }
    }

    fn filtered(&self, predicate: impl Fn(&CatalogEntry) -> bool) -> Vec<CatalogEntry> {
        self.snapshot()
            .iter()
            .filter(|entry| predicate(entry))
            .cloned()
            .collect()
    }
}
