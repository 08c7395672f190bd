//! Store-level tests against a real `.questlog/` directory.
//!
//! These go through `open_store` and the file-backed key-value store, so they
//! exercise the same path the `ql` binary takes.

use std::collections::HashSet;
use std::fs;

use pretty_assertions::assert_eq;
use questlog::io::kv::KeyValueStore;
use questlog::io::recovery;
use questlog::io::store_dir::{OpenStore, init_store, open_store};
use questlog::model::quest::{Shelf, quest_count};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

fn fresh_store() -> (TempDir, OpenStore) {
    let tmp = TempDir::new().unwrap();
    let dir = init_store(tmp.path(), false).unwrap();
    let mut open = open_store(&dir).unwrap();
    open.quests = open.quests.with_rng(StdRng::seed_from_u64(7));
    (tmp, open)
}

#[test]
fn empty_store_shows_seed_without_writing() {
    let (_tmp, open) = fresh_store();

    let active = open.quests.get_quests_data().unwrap();
    let names: Vec<_> = active.values().map(|e| e.category_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Home Quests", "Work Quests", "Shopping Quests", "Event Quests"]
    );
    assert_eq!(quest_count(&active), 0);
    assert!(open.quests.get_archived_quests_data().unwrap().is_empty());

    assert!(!open.dir.join("quests.json").exists());
    assert!(!open.dir.join("archive.json").exists());
}

#[test]
fn added_quest_survives_reopen() {
    let (_tmp, mut open) = fresh_store();
    let added = open.quests.add_quest("Home Quests", "Wash dishes").unwrap();
    assert_eq!(added.category_id, "cat1");

    let reopened = open_store(&open.dir).unwrap();
    let active = reopened.quests.get_quests_data().unwrap();
    assert_eq!(active.len(), 4);
    assert_eq!(active["cat1"].items, vec![added.quest]);
    assert!(!open.dir.join("archive.json").exists());
}

#[test]
fn new_category_is_reused_by_name() {
    let (_tmp, mut open) = fresh_store();
    let first = open.quests.add_quest("Garden", "Weed beds").unwrap();
    let second = open.quests.add_quest("Garden", "Mow lawn").unwrap();

    assert!(first.new_category);
    assert!(!second.new_category);
    assert_eq!(first.category_id, second.category_id);

    let active = open.quests.get_quests_data().unwrap();
    assert_eq!(active.len(), 5);
    let garden = &active[&first.category_id];
    let descriptions: Vec<_> = garden.items.iter().map(|q| q.description.as_str()).collect();
    assert_eq!(descriptions, vec!["Weed beds", "Mow lawn"]);
}

#[test]
fn archiving_moves_exactly_one_quest() {
    let (_tmp, mut open) = fresh_store();
    let keep = open.quests.add_quest("Work Quests", "File report").unwrap();
    let done = open.quests.add_quest("Work Quests", "Book travel").unwrap();

    let before_active = quest_count(&open.quests.get_quests_data().unwrap());
    let archived = open
        .quests
        .move_quest_to_archive(&done.quest.id)
        .unwrap()
        .unwrap();
    assert!(archived.quest.completed);

    let active = open.quests.get_quests_data().unwrap();
    let archive = open.quests.get_archived_quests_data().unwrap();
    assert_eq!(quest_count(&active), before_active - 1);
    assert_eq!(quest_count(&archive), 1);
    assert_eq!(active["cat2"].items, vec![keep.quest.clone()]);
    assert_eq!(archive["cat2"].category_name, "Work Quests");
    assert_eq!(archive["cat2"].items[0].id, done.quest.id);
    assert!(archive["cat2"].items[0].completed);

    // Emptied categories stay in the active map
    open.quests.move_quest_to_archive(&keep.quest.id).unwrap();
    let active = open.quests.get_quests_data().unwrap();
    assert!(active["cat2"].items.is_empty());
}

#[test]
fn unknown_id_leaves_files_untouched() {
    let (_tmp, mut open) = fresh_store();
    let added = open.quests.add_quest("Home Quests", "Sweep").unwrap();
    open.quests.add_quest("Home Quests", "Mop").unwrap();
    open.quests.move_quest_to_archive(&added.quest.id).unwrap();

    let quests_before = fs::read(open.dir.join("quests.json")).unwrap();
    let archive_before = fs::read(open.dir.join("archive.json")).unwrap();

    assert!(open.quests.move_quest_to_archive("nope").unwrap().is_none());
    // Already archived quests are not active any more
    assert!(open.quests.move_quest_to_archive(&added.quest.id).unwrap().is_none());

    assert_eq!(fs::read(open.dir.join("quests.json")).unwrap(), quests_before);
    assert_eq!(fs::read(open.dir.join("archive.json")).unwrap(), archive_before);
}

#[test]
fn ids_stay_unique_across_both_maps() {
    let (_tmp, mut open) = fresh_store();
    for i in 0..40 {
        let category = format!("Category {}", i % 7);
        let added = open.quests.add_quest(&category, &format!("quest {}", i)).unwrap();
        if i % 3 == 0 {
            open.quests.move_quest_to_archive(&added.quest.id).unwrap();
        }
    }

    let active = open.quests.get_quests_data().unwrap();
    let archive = open.quests.get_archived_quests_data().unwrap();

    let quest_ids: Vec<_> = active
        .values()
        .chain(archive.values())
        .flat_map(|e| e.items.iter().map(|q| q.id.clone()))
        .collect();
    let unique: HashSet<_> = quest_ids.iter().collect();
    assert_eq!(unique.len(), quest_ids.len());
    assert_eq!(quest_ids.len(), 40);

    // No quest id reuses a category key
    let category_ids: HashSet<_> = active.keys().chain(archive.keys()).collect();
    assert!(quest_ids.iter().all(|id| !category_ids.contains(id)));

    for id in archive.values().flat_map(|e| e.items.iter().map(|q| &q.id)) {
        let found = open.quests.find_quest(id).unwrap().unwrap();
        assert_eq!(found.shelf, Shelf::Archive);
    }
}

#[test]
fn stored_blob_uses_documented_shape() {
    let (_tmp, mut open) = fresh_store();
    let added = open.quests.add_quest("Event Quests", "Buy cake").unwrap();

    let raw = open.quests.backend().get("quests").unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let event = &value["cat4"];
    assert_eq!(event["categoryName"], "Event Quests");
    assert_eq!(event["items"][0]["id"], added.quest.id.as_str());
    assert_eq!(event["items"][0]["description"], "Buy cake");
    assert_eq!(event["items"][0]["completed"], false);
}

#[test]
fn corrupt_blob_is_reported_and_preserved() {
    let (_tmp, open) = fresh_store();
    fs::write(open.dir.join("quests.json"), "{not json").unwrap();

    for _ in 0..5 {
        assert!(open.quests.get_quests_data().is_err());
    }

    // Re-reading the same bad blob is logged once
    let entries = recovery::read_recovery_entries(&open.dir, None);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].category, recovery::RecoveryCategory::Parser);
    assert_eq!(entries[0].body, "{not json");
    // The bad file is left for the user to fix
    assert_eq!(
        fs::read_to_string(open.dir.join("quests.json")).unwrap(),
        "{not json"
    );
}

#[test]
fn concurrent_writers_lose_no_quests() {
    let (_tmp, open) = fresh_store();
    let dir = open.dir.clone();

    let handles: Vec<_> = (0..6)
        .map(|worker| {
            let dir = dir.clone();
            std::thread::spawn(move || {
                // Each thread opens its own store, as separate `ql` processes do
                let mut own = open_store(&dir).unwrap();
                for i in 0..10 {
                    let category = if i % 2 == 0 { "Home Quests" } else { "Garden" };
                    own.quests
                        .add_quest(category, &format!("worker {} quest {}", worker, i))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let active = open.quests.get_quests_data().unwrap();
    assert_eq!(quest_count(&active), 60);
    assert_eq!(active["cat1"].items.len(), 30);
    // Only one "Garden" category despite racing creators
    let gardens = active.values().filter(|e| e.category_name == "Garden").count();
    assert_eq!(gardens, 1);
}
