use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::ItemStore;
use crate::error::StoreResult;
use crate::models::Item;

#[derive(Default)]
struct Catalog {
    items: BTreeMap<i64, String>,
    /// result id -> (first, second) component ids
    recipes: BTreeMap<i64, Vec<(i64, i64)>>,
}

/// In-process catalog, mutable through a shared reference.
///
/// Counts every query it answers so callers can assert a code path never
/// reached storage.
#[derive(Default)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
    queries: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(self, id: i64, text: impl Into<String>) -> Self {
        self.insert_item(id, text);
        self
    }

    pub fn with_recipe(self, result: i64, first: i64, second: i64) -> Self {
        self.insert_recipe(result, first, second);
        self
    }

    /// `text` is the display text, `"<emoji> <name>"`.
    pub fn insert_item(&self, id: i64, text: impl Into<String>) {
        self.catalog.write().items.insert(id, text.into());
    }

    pub fn insert_recipe(&self, result: i64, first: i64, second: i64) {
        self.catalog
            .write()
            .recipes
            .entry(result)
            .or_default()
            .push((first, second));
    }

    /// Number of queries answered so far.
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }
}

/// Name part of a display text; the emoji prefix is not searchable.
fn name_of(text: &str) -> &str {
    text.split_once(' ').map_or(text, |(_, name)| name)
}

impl Catalog {
    fn item(&self, id: i64) -> Option<Item> {
        self.items.get(&id).map(|text| Item::new(id, text.clone()))
    }
}

impl ItemStore for MemoryStore {
    fn total_item_count(&self) -> StoreResult<u64> {
        self.record_query();
        Ok(self.catalog.read().items.len() as u64)
    }

    fn item_by_id(&self, id: i64) -> StoreResult<Option<Item>> {
        self.record_query();
        Ok(self.catalog.read().item(id))
    }

    fn item_batch(&self, limit: usize, after_id: i64) -> StoreResult<Vec<Item>> {
        self.record_query();
        let catalog = self.catalog.read();
        let items = catalog
            .items
            .range(after_id.saturating_add(1)..)
            .take(limit)
            .map(|(id, text)| Item::new(*id, text.clone()))
            .collect();
        Ok(items)
    }

    fn items_by_fuzzy_name(&self, query: &str, limit: usize) -> StoreResult<Vec<Item>> {
        self.record_query();
        let needle = query.to_lowercase();
        let catalog = self.catalog.read();
        let items = catalog
            .items
            .iter()
            .filter(|(_, text)| name_of(text).to_lowercase().contains(&needle))
            .take(limit)
            .map(|(id, text)| Item::new(*id, text.clone()))
            .collect();
        Ok(items)
    }

    fn first_recipe_for(&self, item_id: i64) -> StoreResult<Option<(Item, Item)>> {
        self.record_query();
        let catalog = self.catalog.read();
        let Some(candidates) = catalog.recipes.get(&item_id) else {
            return Ok(None);
        };

        // Only recipes whose components exist are candidates.
        let chosen = candidates
            .iter()
            .filter_map(|&(first, second)| Some((catalog.item(first)?, catalog.item(second)?)))
            .min_by(|a, b| a.0.id.cmp(&b.0.id).then(b.1.id.cmp(&a.1.id)));
        Ok(chosen)
    }
}
