use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::content::ContentEntry;

/// A catalog entry with its precomputed lowercase projections.
#[derive(Debug, Clone)]
pub struct IndexedEntry {
    pub entry: ContentEntry,
    pub searchable_text: String,
    pub title_lower: String,
    pub category_lower: String,
    pub description_lower: String,
}

impl IndexedEntry {
    pub fn new(entry: ContentEntry) -> Self {
        Self {
            searchable_text: entry.searchable_text(),
            title_lower: entry.title.to_lowercase(),
            category_lower: entry.category.to_lowercase(),
            description_lower: entry.description.to_lowercase(),
            entry,
        }
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }
}

/// Immutable view of the whole index.
///
/// Entries iterate in catalog order. Re-inserting an id replaces the
/// entry in place, so the slot of its first occurrence is kept.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    entries: Vec<IndexedEntry>,
    positions: HashMap<String, usize>,
}

impl IndexSnapshot {
    pub fn build(catalog: &[ContentEntry]) -> Self {
        let mut snapshot = Self {
            entries: Vec::with_capacity(catalog.len()),
            positions: HashMap::with_capacity(catalog.len()),
        };
        for entry in catalog {
            snapshot.upsert(entry.clone());
        }
        snapshot
    }

    fn upsert(&mut self, entry: ContentEntry) {
        let indexed = IndexedEntry::new(entry);
        match self.positions.get(indexed.id()) {
            Some(&pos) => self.entries[pos] = indexed,
            None => {
                self.positions
                    .insert(indexed.id().to_string(), self.entries.len());
                self.entries.push(indexed);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&IndexedEntry> {
        self.positions.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedEntry> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[IndexedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Storage seam for the id → entry map behind the search engine.
///
/// Implementations must make [`rebuild`](Self::rebuild) atomic with respect
/// to [`snapshot`](Self::snapshot): a reader sees either the old index or
/// the new one in full.
pub trait ContentRepository: Send + Sync {
    fn get(&self, id: &str) -> Option<IndexedEntry>;

    /// Insert or replace a single entry.
    fn put(&self, entry: ContentEntry);

    /// Discard everything and index `catalog` from scratch.
    fn rebuild(&self, catalog: &[ContentEntry]);

    fn snapshot(&self) -> Arc<IndexSnapshot>;

    fn len(&self) -> usize {
        self.snapshot().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory repository that publishes copy-on-write snapshots.
#[derive(Debug, Default)]
pub struct ContentIndex {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(catalog: &[ContentEntry]) -> Self {
        let index = Self::new();
        index.rebuild(catalog);
        index
    }
}

impl ContentRepository for ContentIndex {
    fn get(&self, id: &str) -> Option<IndexedEntry> {
        self.current.read().get(id).cloned()
    }

    fn put(&self, entry: ContentEntry) {
        let mut current = self.current.write();
        let mut next = (**current).clone();
        next.upsert(entry);
        *current = Arc::new(next);
    }

    fn rebuild(&self, catalog: &[ContentEntry]) {
        // Build outside the lock; readers keep the old snapshot meanwhile.
        let next = Arc::new(IndexSnapshot::build(catalog));
        let count = next.len();
        *self.current.write() = next;
        tracing::debug!(
            entries = count,
            supplied = catalog.len(),
            "content index rebuilt"
        );
    }

    fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current.read().clone()
    }
}
