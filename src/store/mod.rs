//! Storage gateway for the item catalog.
//!
//! Handlers and the recipe resolver only see the [`ItemStore`] trait. The
//! SQLite backend serves production traffic; the in-memory backend is used
//! for tests and embedding.

pub mod memory;
pub mod sqlite;

use crate::error::StoreResult;
use crate::models::Item;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Read-only queries the API needs from the catalog.
///
/// Implementations must tolerate concurrent callers. Calls block, so async
/// code should run them on the blocking pool.
pub trait ItemStore: Send + Sync {
    /// Number of items in the catalog.
    fn total_item_count(&self) -> StoreResult<u64>;

    /// Item with the given id, if present.
    fn item_by_id(&self, id: i64) -> StoreResult<Option<Item>>;

    /// Up to `limit` items with id strictly greater than `after_id`, ascending by id.
    fn item_batch(&self, limit: usize, after_id: i64) -> StoreResult<Vec<Item>>;

    /// Up to `limit` items whose name contains `query`, ignoring case.
    fn items_by_fuzzy_name(&self, query: &str, limit: usize) -> StoreResult<Vec<Item>>;

    /// Components of the preferred recipe producing `item_id`.
    ///
    /// Among several recipes the one with the lowest first component wins,
    /// ties going to the highest second component. `None` when nothing
    /// produces the item.
    fn first_recipe_for(&self, item_id: i64) -> StoreResult<Option<(Item, Item)>>;
}
