use rand::Rng;
use serde::Serialize;

use crate::model::quest::{CategoryEntry, Quest, QuestMap};
use crate::ops::id::{fresh_category_id, fresh_quest_id};

/// Result of adding a quest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddedQuest {
    pub category_id: String,
    /// True if the category did not exist before this quest
    pub new_category: bool,
    pub quest: Quest,
}

/// Result of moving a quest into the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedQuest {
    pub category_id: String,
    pub category_name: String,
    pub quest: Quest,
}

/// A quest located inside a map
#[derive(Debug, Clone, Copy)]
pub struct QuestRef<'a> {
    pub category_id: &'a str,
    pub category_name: &'a str,
    pub quest: &'a Quest,
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Id of the first category (in map order) whose name matches exactly
pub fn find_category_id<'a>(map: &'a QuestMap, name: &str) -> Option<&'a str> {
    map.iter()
        .find(|(_, entry)| entry.category_name == name)
        .map(|(id, _)| id.as_str())
}

/// First quest with the given id, scanning categories in order
pub fn find_quest<'a>(map: &'a QuestMap, quest_id: &str) -> Option<QuestRef<'a>> {
    map.iter().find_map(|(category_id, entry)| {
        entry
            .items
            .iter()
            .find(|q| q.id == quest_id)
            .map(|quest| QuestRef {
                category_id,
                category_name: &entry.category_name,
                quest,
            })
    })
}

/// Keep only categories with the given name
pub fn filter_by_category(map: &QuestMap, name: &str) -> QuestMap {
    map.iter()
        .filter(|(_, entry)| entry.category_name == name)
        .map(|(id, entry)| (id.clone(), entry.clone()))
        .collect()
}

/// Per-category quest counts across both maps
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    pub active: usize,
    pub archived: usize,
}

/// One row per category id, active categories first in map order, then
/// categories that only survive in the archive.
pub fn summarize_categories(active: &QuestMap, archive: &QuestMap) -> Vec<CategorySummary> {
    let mut rows: Vec<CategorySummary> = active
        .iter()
        .map(|(id, entry)| CategorySummary {
            id: id.clone(),
            name: entry.category_name.clone(),
            active: entry.items.len(),
            archived: archive.get(id).map_or(0, |a| a.items.len()),
        })
        .collect();

    for (id, entry) in archive {
        if !active.contains_key(id) {
            rows.push(CategorySummary {
                id: id.clone(),
                name: entry.category_name.clone(),
                active: 0,
                archived: entry.items.len(),
            });
        }
    }
    rows
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

/// Append a new quest under the category named `category`, creating the
/// category if no existing one has that name.
///
/// `archive` is only read, to keep generated ids clear of archived quests.
pub fn add_quest<R: Rng + ?Sized>(
    rng: &mut R,
    active: &mut QuestMap,
    archive: &QuestMap,
    category: &str,
    description: &str,
) -> AddedQuest {
    let (category_id, new_category) = match find_category_id(active, category) {
        Some(id) => (id.to_string(), false),
        None => (fresh_category_id(rng, active, archive), true),
    };

    let quest = Quest::new(
        fresh_quest_id(rng, active, archive, &category_id),
        description.to_string(),
    );
    active
        .entry(category_id.clone())
        .or_insert_with(|| CategoryEntry::new(category))
        .items
        .push(quest.clone());

    AddedQuest {
        category_id,
        new_category,
        quest,
    }
}

/// Move the first quest matching `quest_id` from `active` to the same
/// category in `archive`, marking it completed.
///
/// Returns `None` and leaves both maps untouched when no quest matches.
pub fn archive_quest(
    active: &mut QuestMap,
    archive: &mut QuestMap,
    quest_id: &str,
) -> Option<ArchivedQuest> {
    let (category_id, index) = active.iter().find_map(|(id, entry)| {
        entry
            .items
            .iter()
            .position(|q| q.id == quest_id)
            .map(|i| (id.clone(), i))
    })?;

    let entry = active.get_mut(&category_id)?;
    let mut quest = entry.items.remove(index);
    quest.completed = true;
    let category_name = entry.category_name.clone();

    archive
        .entry(category_id.clone())
        .or_insert_with(|| CategoryEntry::new(category_name.clone()))
        .items
        .push(quest.clone());

    Some(ArchivedQuest {
        category_id,
        category_name,
        quest,
    })
}
