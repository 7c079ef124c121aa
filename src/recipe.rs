//! Recipe tree resolution.
//!
//! Walks the "built from" relation depth-first from a target item and
//! flattens the result into parent-pointer nodes. Every expanded item is
//! recorded in a visited set, so cyclic or shared sub-recipes expand once.

use std::collections::HashSet;

use crate::error::ResolveError;
use crate::models::RecipeNode;
use crate::store::ItemStore;

/// Ids treated as base materials when none are configured.
pub const DEFAULT_BASE_ITEMS: [i64; 4] = [1, 2, 3, 4];

#[derive(Debug, Clone)]
pub struct RecipeResolver {
    base_items: HashSet<i64>,
}

impl RecipeResolver {
    /// `base_items` are never expanded: they start out visited.
    pub fn new(base_items: impl IntoIterator<Item = i64>) -> Self {
        Self {
            base_items: base_items.into_iter().collect(),
        }
    }

    /// Resolve the recipe tree rooted at `item_id`.
    ///
    /// The root comes first with parent `-1`. Each expanded item emits both
    /// of its components before either component is expanded, and the first
    /// component's subtree is finished before the second is visited.
    /// Components are always emitted; an id is expanded at most once.
    pub fn resolve<S>(&self, store: &S, item_id: i64) -> Result<Vec<RecipeNode>, ResolveError>
    where
        S: ItemStore + ?Sized,
    {
        let root = store
            .item_by_id(item_id)?
            .ok_or(ResolveError::ItemNotFound(item_id))?;

        let mut tree = vec![RecipeNode::root(root)];
        let mut visited = self.base_items.clone();
        let mut pending = vec![item_id];

        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }

            let Some((first, second)) = store.first_recipe_for(current)? else {
                continue;
            };

            // Reversed so the first component is expanded first.
            pending.push(second.id);
            pending.push(first.id);

            tree.push(RecipeNode::child(first, current));
            tree.push(RecipeNode::child(second, current));
        }

        tracing::debug!(item_id, nodes = tree.len(), "recipe resolved");
        Ok(tree)
    }
}

impl Default for RecipeResolver {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_ITEMS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::models::Item;
    use crate::store::MemoryStore;

    fn ids(tree: &[RecipeNode]) -> Vec<(i64, i64)> {
        tree.iter().map(|n| (n.item_id, n.parent_id)).collect()
    }

    fn sample_store() -> MemoryStore {
        MemoryStore::new()
            .with_item(0, "🌍 Earth")
            .with_item(1, "💧 Water")
            .with_item(2, "🌱 Plant")
            .with_item(3, "☀️ Sun")
            .with_item(5, "🌳 Tree")
            .with_recipe(5, 2, 3)
            .with_recipe(2, 0, 1)
    }

    #[test]
    fn test_depth_first_order() {
        let resolver = RecipeResolver::new([0, 1]);
        let tree = resolver.resolve(&sample_store(), 5).unwrap();

        assert_eq!(ids(&tree), vec![(5, -1), (2, 5), (3, 5), (0, 2), (1, 2)]);
        assert_eq!(tree[0].text, "🌳 Tree");
        assert_eq!(tree[3].text, "🌍 Earth");
    }

    #[test]
    fn test_first_subtree_finishes_before_second() {
        let store = MemoryStore::new()
            .with_item(1, "a")
            .with_item(2, "b")
            .with_item(3, "c")
            .with_item(4, "d")
            .with_item(5, "e")
            .with_item(6, "f")
            .with_item(7, "g")
            .with_recipe(7, 5, 6)
            .with_recipe(5, 1, 2)
            .with_recipe(6, 3, 4);
        let tree = RecipeResolver::new(Vec::new()).resolve(&store, 7).unwrap();

        assert_eq!(
            ids(&tree),
            vec![(7, -1), (5, 7), (6, 7), (1, 5), (2, 5), (3, 6), (4, 6)]
        );
    }

    #[test]
    fn test_leaf_item_is_root_only() {
        let resolver = RecipeResolver::new([0, 1]);
        let tree = resolver.resolve(&sample_store(), 3).unwrap();
        assert_eq!(ids(&tree), vec![(3, -1)]);
    }

    #[test]
    fn test_base_item_is_not_expanded() {
        let store = sample_store().with_recipe(1, 0, 0);
        let tree = RecipeResolver::new([1]).resolve(&store, 1).unwrap();
        assert_eq!(ids(&tree), vec![(1, -1)]);
    }

    #[test]
    fn test_missing_item() {
        let err = RecipeResolver::default()
            .resolve(&sample_store(), 42)
            .unwrap_err();
        assert!(matches!(err, ResolveError::ItemNotFound(42)));
    }

    #[test]
    fn test_cycle_terminates_and_expands_once() {
        // 10 <- (11, 12), 11 <- (10, 12), 12 <- (11, 10)
        let store = MemoryStore::new()
            .with_item(10, "x")
            .with_item(11, "y")
            .with_item(12, "z")
            .with_recipe(10, 11, 12)
            .with_recipe(11, 10, 12)
            .with_recipe(12, 11, 10);
        let tree = RecipeResolver::new(Vec::new()).resolve(&store, 10).unwrap();

        assert_eq!(
            ids(&tree),
            vec![(10, -1), (11, 10), (12, 10), (10, 11), (12, 11), (11, 12), (10, 12)]
        );

        // Each expansion emits a pair keyed by its parent.
        let mut sources: Vec<i64> = tree[1..].iter().map(|n| n.parent_id).collect();
        sources.dedup();
        assert_eq!(sources, vec![10, 11, 12]);
    }

    #[test]
    fn test_repeated_component_is_emitted_twice() {
        let store = MemoryStore::new()
            .with_item(1, "a")
            .with_item(2, "b")
            .with_item(3, "c")
            .with_recipe(3, 2, 2)
            .with_recipe(2, 1, 1);
        let tree = RecipeResolver::new([1]).resolve(&store, 3).unwrap();

        assert_eq!(ids(&tree), vec![(3, -1), (2, 3), (2, 3), (1, 2), (1, 2)]);
    }

    struct FailingStore {
        inner: MemoryStore,
        fail_on: i64,
    }

    impl ItemStore for FailingStore {
        fn total_item_count(&self) -> StoreResult<u64> {
            self.inner.total_item_count()
        }

        fn item_by_id(&self, id: i64) -> StoreResult<Option<Item>> {
            self.inner.item_by_id(id)
        }

        fn item_batch(&self, limit: usize, after_id: i64) -> StoreResult<Vec<Item>> {
            self.inner.item_batch(limit, after_id)
        }

        fn items_by_fuzzy_name(&self, query: &str, limit: usize) -> StoreResult<Vec<Item>> {
            self.inner.items_by_fuzzy_name(query, limit)
        }

        fn first_recipe_for(&self, item_id: i64) -> StoreResult<Option<(Item, Item)>> {
            if item_id == self.fail_on {
                return Err(StoreError::Unavailable("disk gone".to_string()));
            }
            self.inner.first_recipe_for(item_id)
        }
    }

    #[test]
    fn test_storage_error_aborts_resolution() {
        let store = FailingStore {
            inner: sample_store(),
            fail_on: 2,
        };
        let err = RecipeResolver::new([0, 1]).resolve(&store, 5).unwrap_err();
        assert!(matches!(err, ResolveError::Storage(StoreError::Unavailable(_))));
    }
}
