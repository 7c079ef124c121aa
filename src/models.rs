use serde::{Serialize, Serializer};

/// A catalog entry. Serializes as `[id, text]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: i64,
    /// Emoji prefix and name, e.g. `"💧 Water"`.
    pub text: String,
}

impl Item {
    pub fn new(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    pub fn from_parts(id: i64, emoji: &str, name: &str) -> Self {
        Self::new(id, format!("{} {}", emoji, name))
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.id, &self.text).serialize(serializer)
    }
}

/// Parent id carried by the root of a recipe tree.
pub const ROOT_PARENT: i64 = -1;

/// One entry of a flattened recipe tree. Serializes as `[id, text, parentId]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeNode {
    pub item_id: i64,
    pub text: String,
    pub parent_id: i64,
}

impl RecipeNode {
    pub fn root(item: Item) -> Self {
        Self {
            item_id: item.id,
            text: item.text,
            parent_id: ROOT_PARENT,
        }
    }

    pub fn child(item: Item, parent_id: i64) -> Self {
        Self {
            item_id: item.id,
            text: item.text,
            parent_id,
        }
    }
}

impl Serialize for RecipeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.item_id, &self.text, self.parent_id).serialize(serializer)
    }
}

/// Body of `getTotalItems`.
#[derive(Debug, Serialize)]
pub struct TotalItems {
    #[serde(rename = "Total")]
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_serializes_as_pair() {
        let item = Item::from_parts(3, "🔥", "Fire");
        let json = serde_json::to_string(&item).unwrap();
        assert_eq!(json, r#"[3,"🔥 Fire"]"#);
    }

    #[test]
    fn test_recipe_node_serializes_as_triple() {
        let nodes = vec![
            RecipeNode::root(Item::new(5, "a")),
            RecipeNode::child(Item::new(2, "b"), 5),
        ];
        let json = serde_json::to_string(&nodes).unwrap();
        assert_eq!(json, r#"[[5,"a",-1],[2,"b",5]]"#);
    }

    #[test]
    fn test_total_items_field_name() {
        let json = serde_json::to_string(&TotalItems { total: 12 }).unwrap();
        assert_eq!(json, r#"{"Total":12}"#);
    }
}
