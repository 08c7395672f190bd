use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single quest (todo item)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    /// Opaque base-36 token
    pub id: String,
    pub description: String,
    /// False while the quest is active, true once archived
    pub completed: bool,
}

impl Quest {
    /// Create a new, not yet completed quest
    pub fn new(id: String, description: String) -> Self {
        Quest {
            id,
            description,
            completed: false,
        }
    }
}

/// A category's entry in a quest map: its display name and its quests in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntry {
    pub category_name: String,
    #[serde(default)]
    pub items: Vec<Quest>,
}

impl CategoryEntry {
    pub fn new(category_name: impl Into<String>) -> Self {
        CategoryEntry {
            category_name: category_name.into(),
            items: Vec::new(),
        }
    }
}

/// A category identity, as handed out to views
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Category id → category entry. Used for both the active store and the
/// archive; key order is the order categories were created in.
pub type QuestMap = IndexMap<String, CategoryEntry>;

/// Which of the two persisted maps a quest lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shelf {
    Active,
    Archive,
}

impl Shelf {
    /// Key of the persisted blob backing this shelf
    pub fn key(self) -> &'static str {
        match self {
            Shelf::Active => "quests",
            Shelf::Archive => "archive",
        }
    }
}

impl std::fmt::Display for Shelf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shelf::Active => write!(f, "active"),
            Shelf::Archive => write!(f, "archive"),
        }
    }
}

/// List the categories of a map in order
pub fn categories(map: &QuestMap) -> Vec<Category> {
    map.iter()
        .map(|(id, entry)| Category {
            id: id.clone(),
            name: entry.category_name.clone(),
        })
        .collect()
}

/// Total number of quests across all categories
pub fn quest_count(map: &QuestMap) -> usize {
    map.values().map(|entry| entry.items.len()).sum()
}
