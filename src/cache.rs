//! Precomputed JSON payloads for the catalog listing endpoints.
//!
//! Two kinds of entries live here:
//!
//! - **Pages**: `getNextItems` bodies for a fixed run of cursors, built once
//!   before the server accepts connections and read-only afterwards.
//! - **Total**: the `getTotalItems` body, replaced wholesale by a single
//!   background task on a fixed interval. Readers see the old or the new
//!   payload, never a mix.
//!
//! Payloads are opaque bytes; nothing here parses them again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::error::{ApiError, Result};
use crate::models::TotalItems;
use crate::store::ItemStore;

/// Serialize one `getNextItems` page straight from storage.
pub fn render_page<S>(store: &S, page_size: usize, after_id: i64) -> Result<Bytes>
where
    S: ItemStore + ?Sized,
{
    let items = store.item_batch(page_size, after_id)?;
    Ok(Bytes::from(serde_json::to_vec(&items)?))
}

/// Serialize the `getTotalItems` body straight from storage.
pub fn render_total<S>(store: &S) -> Result<Bytes>
where
    S: ItemStore + ?Sized,
{
    let total = store.total_item_count()?;
    Ok(Bytes::from(serde_json::to_vec(&TotalItems { total })?))
}

/// Cursors warmed at startup: `0, page_size, 2 * page_size, ...`.
///
/// Stops early at the first cursor that does not fit an `i64`.
pub fn warm_cursors(page_size: usize, pages: usize) -> Vec<i64> {
    (0..pages)
        .map_while(|n| n.checked_mul(page_size).and_then(|c| i64::try_from(c).ok()))
        .collect()
}

pub struct ItemCache {
    pages: HashMap<i64, Bytes>,
    total: RwLock<Bytes>,
}

impl ItemCache {
    /// Build the page cache and the initial total.
    ///
    /// Pages are fetched in cursor order. The first empty page ends the
    /// warm-up, and the page just before it is dropped as well: the last
    /// non-empty page sits at the catalog's edge and is served live.
    pub fn warm<S>(store: &S, page_size: usize, cursors: &[i64]) -> Result<Self>
    where
        S: ItemStore + ?Sized,
    {
        let mut pages = HashMap::with_capacity(cursors.len());

        for (idx, &after_id) in cursors.iter().enumerate() {
            let items = store.item_batch(page_size, after_id)?;
            if items.is_empty() {
                if let Some(previous) = idx.checked_sub(1).map(|i| cursors[i]) {
                    pages.remove(&previous);
                    tracing::info!(after = previous, "dropped edge page from cache");
                }
                break;
            }

            pages.insert(after_id, Bytes::from(serde_json::to_vec(&items)?));
            tracing::info!(after = after_id, "cached request: getNextItems");
        }

        let total = render_total(store)?;

        Ok(Self {
            pages,
            total: RwLock::new(total),
        })
    }

    pub fn page(&self, after_id: i64) -> Option<Bytes> {
        self.pages.get(&after_id).cloned()
    }

    pub fn cached_cursors(&self) -> Vec<i64> {
        let mut cursors: Vec<i64> = self.pages.keys().copied().collect();
        cursors.sort_unstable();
        cursors
    }

    pub fn total(&self) -> Bytes {
        self.total.read().clone()
    }

    /// Recompute the total. On failure the previous payload stays in place.
    pub fn refresh_total<S>(&self, store: &S) -> Result<()>
    where
        S: ItemStore + ?Sized,
    {
        let payload = render_total(store)?;
        *self.total.write() = payload;
        Ok(())
    }

    /// Recompute the total every `every`, forever. The first refresh happens
    /// one interval after the call since `warm` already computed a value.
    pub fn spawn_total_refresh(
        self: &Arc<Self>,
        store: Arc<dyn ItemStore>,
        every: Duration,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;

                let cache = Arc::clone(&cache);
                let store = Arc::clone(&store);
                let outcome = tokio::task::spawn_blocking(move || cache.refresh_total(&*store))
                    .await
                    .map_err(ApiError::from)
                    .and_then(|result| result);

                match outcome {
                    Ok(()) => tracing::debug!("refreshed total item count"),
                    Err(e) => tracing::warn!(error = %e, "unable to refresh total item count"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::models::Item;
    use crate::store::MemoryStore;

    /// Answers every query except the item count.
    struct CountFailingStore(MemoryStore);

    impl ItemStore for CountFailingStore {
        fn total_item_count(&self) -> StoreResult<u64> {
            Err(StoreError::Unavailable("count query timed out".to_string()))
        }

        fn item_by_id(&self, id: i64) -> StoreResult<Option<Item>> {
            self.0.item_by_id(id)
        }

        fn item_batch(&self, limit: usize, after_id: i64) -> StoreResult<Vec<Item>> {
            self.0.item_batch(limit, after_id)
        }

        fn items_by_fuzzy_name(&self, query: &str, limit: usize) -> StoreResult<Vec<Item>> {
            self.0.items_by_fuzzy_name(query, limit)
        }

        fn first_recipe_for(&self, item_id: i64) -> StoreResult<Option<(Item, Item)>> {
            self.0.first_recipe_for(item_id)
        }
    }

    fn store_with(ids: impl IntoIterator<Item = i64>) -> MemoryStore {
        let store = MemoryStore::new();
        for id in ids {
            store.insert_item(id, format!("item {}", id));
        }
        store
    }

    #[test]
    fn test_warm_cursors() {
        assert_eq!(warm_cursors(1000, 3), vec![0, 1000, 2000]);
    }

    #[test]
    fn test_warm_cursors_stop_before_overflow() {
        assert_eq!(warm_cursors(usize::MAX, 3), vec![0]);
        assert_eq!(warm_cursors(usize::MAX / 2, usize::MAX), vec![0]);
    }

    #[test]
    fn test_warm_fills_every_full_cursor() {
        let store = store_with(1..=30);
        let cache = ItemCache::warm(&store, 10, &warm_cursors(10, 2)).unwrap();

        assert_eq!(cache.cached_cursors(), vec![0, 10]);
        let page: serde_json::Value = serde_json::from_slice(&cache.page(10).unwrap()).unwrap();
        assert_eq!(page[0], serde_json::json!([11, "item 11"]));
        assert_eq!(page.as_array().unwrap().len(), 10);
    }

    #[test]
    fn test_empty_page_drops_previous_entry() {
        // Pages after 0 and 10 have items, the page after 20 is empty.
        let store = store_with(1..=15);
        let cache = ItemCache::warm(&store, 10, &warm_cursors(10, 5)).unwrap();

        assert_eq!(cache.cached_cursors(), vec![0]);
        assert!(cache.page(10).is_none());
    }

    #[test]
    fn test_empty_catalog_caches_nothing() {
        let store = MemoryStore::new();
        let cache = ItemCache::warm(&store, 10, &warm_cursors(10, 3)).unwrap();

        assert!(cache.cached_cursors().is_empty());
        assert_eq!(&cache.total()[..], br#"{"Total":0}"#);
    }

    #[test]
    fn test_refresh_total_replaces_payload() {
        let store = store_with(1..=3);
        let cache = ItemCache::warm(&store, 10, &[]).unwrap();
        assert_eq!(&cache.total()[..], br#"{"Total":3}"#);

        store.insert_item(4, "item 4");
        assert_eq!(&cache.total()[..], br#"{"Total":3}"#);

        cache.refresh_total(&store).unwrap();
        assert_eq!(&cache.total()[..], br#"{"Total":4}"#);
    }

    #[test]
    fn test_failed_refresh_keeps_stale_total() {
        let store = store_with(1..=3);
        let cache = ItemCache::warm(&store, 10, &[]).unwrap();

        let failing = CountFailingStore(store_with(1..=8));
        let err = cache.refresh_total(&failing).unwrap_err();
        assert!(matches!(err, ApiError::Storage(StoreError::Unavailable(_))));
        assert_eq!(&cache.total()[..], br#"{"Total":3}"#);
    }

    #[tokio::test]
    async fn test_background_refresh_picks_up_changes() {
        let store = Arc::new(store_with(1..=2));
        let cache = Arc::new(ItemCache::warm(&*store, 10, &[]).unwrap());
        let handle = cache.spawn_total_refresh(store.clone(), Duration::from_millis(20));

        store.insert_item(3, "item 3");
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(&cache.total()[..], br#"{"Total":3}"#);
        handle.abort();
    }
}
