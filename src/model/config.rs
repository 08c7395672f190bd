use serde::{Deserialize, Serialize};

use super::quest::{CategoryEntry, QuestMap};

/// Configuration from questlog.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub store: StoreSettings,
    /// Categories used to seed an empty store
    #[serde(default = "default_seed")]
    pub seed: Vec<SeedCategory>,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            store: StoreSettings::default(),
            seed: default_seed(),
            ui: UiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// How long a writer waits for the store lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Print quest ids next to descriptions
    #[serde(default = "default_true")]
    pub show_ids: bool,
    /// Render categories that have no quests
    #[serde(default = "default_true")]
    pub show_empty_categories: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            show_ids: true,
            show_empty_categories: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

/// The four categories a fresh store starts with
pub fn default_seed() -> Vec<SeedCategory> {
    [
        ("cat1", "Home Quests"),
        ("cat2", "Work Quests"),
        ("cat3", "Shopping Quests"),
        ("cat4", "Event Quests"),
    ]
    .into_iter()
    .map(|(id, name)| SeedCategory {
        id: id.to_string(),
        name: name.to_string(),
    })
    .collect()
}

/// Build the initial active map from a seed list. Later duplicates of an id
/// are ignored.
pub fn seed_map(seed: &[SeedCategory]) -> QuestMap {
    let mut map = QuestMap::new();
    for cat in seed {
        map.entry(cat.id.clone())
            .or_insert_with(|| CategoryEntry::new(cat.name.clone()));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gets_all_defaults() {
        let config: StoreConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.lock_timeout_ms, 5000);
        assert_eq!(config.seed, default_seed());
        assert!(config.ui.show_ids);
        assert!(config.ui.show_empty_categories);
    }

    #[test]
    fn test_explicit_seed_replaces_default() {
        let config: StoreConfig = toml::from_str(
            r#"
[[seed]]
id = "errands"
name = "Errands"
"#,
        )
        .unwrap();
        assert_eq!(config.seed.len(), 1);
        let map = seed_map(&config.seed);
        assert_eq!(map["errands"].category_name, "Errands");
    }

    #[test]
    fn test_default_seed_map_has_four_empty_categories() {
        let map = seed_map(&default_seed());
        let names: Vec<_> = map.values().map(|e| e.category_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Home Quests", "Work Quests", "Shopping Quests", "Event Quests"]
        );
        assert!(map.values().all(|e| e.items.is_empty()));
    }
}
