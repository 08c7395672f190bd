use serde::Serialize;

use crate::io::quest_store::LocatedQuest;
use crate::model::config::UiConfig;
use crate::model::quest::{CategoryEntry, Quest, QuestMap, Shelf};
use crate::ops::quest_ops::CategorySummary;

/// Shown under an active category that has no quests left
pub const EMPTY_ACTIVE_MESSAGE: &str =
    "No quests remaining in this category! Why not add a new quest?";

/// Shown under a history category that has nothing archived
pub const EMPTY_HISTORY_MESSAGE: &str = "No completed quests in this category yet.";

/// The screens of the quest log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Add,
    Active,
    History,
    Settings,
}

impl Page {
    pub fn title(self) -> &'static str {
        match self {
            Page::Add => "Add new quest",
            Page::Active => "All active quests",
            Page::History => "Quests history",
            Page::Settings => "Settings",
        }
    }
}

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CategoryJson<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub quests: &'a [Quest],
}

#[derive(Serialize)]
pub struct LocatedQuestJson<'a> {
    pub shelf: Shelf,
    pub category_id: &'a str,
    pub category_name: &'a str,
    #[serde(flatten)]
    pub quest: &'a Quest,
}

pub fn map_to_json(map: &QuestMap) -> Vec<CategoryJson<'_>> {
    map.iter()
        .map(|(id, entry)| CategoryJson {
            id,
            name: &entry.category_name,
            quests: &entry.items,
        })
        .collect()
}

pub fn located_to_json(found: &LocatedQuest) -> LocatedQuestJson<'_> {
    LocatedQuestJson {
        shelf: found.shelf,
        category_id: &found.category_id,
        category_name: &found.category_name,
        quest: &found.quest,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn check_char(quest: &Quest) -> char {
    if quest.completed { 'x' } else { ' ' }
}

/// `[ ] k3x9 Wash dishes`
pub fn format_quest_line(quest: &Quest, show_ids: bool) -> String {
    if show_ids {
        format!("[{}] {} {}", check_char(quest), quest.id, quest.description)
    } else {
        format!("[{}] {}", check_char(quest), quest.description)
    }
}

pub fn format_category_header(name: &str) -> String {
    format!("== {} ==", name)
}

fn format_category(entry: &CategoryEntry, empty_message: &str, ui: &UiConfig) -> Vec<String> {
    let mut lines = vec![format_category_header(&entry.category_name)];
    if entry.items.is_empty() {
        lines.push(format!("  {}", empty_message));
    }
    for quest in &entry.items {
        lines.push(format!("  {}", format_quest_line(quest, ui.show_ids)));
    }
    lines
}

/// Page title followed by every category of `map`, in order
pub fn format_listing(page: Page, map: &QuestMap, ui: &UiConfig) -> Vec<String> {
    let empty_message = match page {
        Page::History => EMPTY_HISTORY_MESSAGE,
        _ => EMPTY_ACTIVE_MESSAGE,
    };

    let mut lines = vec![format!("# {}", page.title())];
    for entry in map.values() {
        if entry.items.is_empty() && !ui.show_empty_categories {
            continue;
        }
        lines.push(String::new());
        lines.extend(format_category(entry, empty_message, ui));
    }
    if lines.len() == 1 {
        lines.push(String::new());
        lines.push("(no categories)".to_string());
    }
    lines
}

pub fn format_quest_detail(found: &LocatedQuest) -> Vec<String> {
    vec![
        format_quest_line(&found.quest, true),
        format!("category: {} ({})", found.category_name, found.category_id),
        format!(
            "status: {}",
            match found.shelf {
                Shelf::Active => "active",
                Shelf::Archive => "completed (archived)",
            }
        ),
    ]
}

/// `  Home Quests (cat1)  2 active, 5 done`
pub fn format_category_summary(row: &CategorySummary) -> String {
    format!(
        "  {} ({})  {} active, {} done",
        row.name, row.id, row.active, row.archived
    )
}
