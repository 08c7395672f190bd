//! The quest store: active and archived quests persisted as two independent
//! JSON blobs (`quests` and `archive`) in a [`KeyValueStore`].
//!
//! Every operation deserializes fresh from the backend; nothing is cached
//! between calls. Mutations hold the backend's writer lock across the whole
//! read-modify-write.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::io::kv::{KeyValueStore, KvError};
use crate::io::lock::LockError;
use crate::io::recovery::{RecoveryCategory, RecoveryEntry, log_recovery};
use crate::model::config::{SeedCategory, StoreConfig, seed_map};
use crate::model::quest::{Quest, QuestMap, Shelf};
use crate::ops::quest_ops::{self, AddedQuest, ArchivedQuest};

/// Error type for quest store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read '{key}': {source}")]
    Read { key: &'static str, source: KvError },
    #[error("could not save '{key}': {source}")]
    Write { key: &'static str, source: KvError },
    #[error("stored '{key}' data is corrupt: {source}")]
    Parse {
        key: &'static str,
        source: serde_json::Error,
    },
    #[error("could not serialize '{key}': {source}")]
    Serialize {
        key: &'static str,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// A quest found by id, with where it lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedQuest {
    pub shelf: Shelf,
    pub category_id: String,
    pub category_name: String,
    pub quest: Quest,
}

pub struct QuestStore<S: KeyValueStore> {
    kv: S,
    seed: Vec<SeedCategory>,
    lock_timeout: Duration,
    rng: StdRng,
}

impl<S: KeyValueStore> QuestStore<S> {
    pub fn new(kv: S, config: &StoreConfig) -> Self {
        QuestStore {
            kv,
            seed: config.seed.clone(),
            lock_timeout: Duration::from_millis(config.store.lock_timeout_ms),
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the id generator, e.g. with a seeded one for reproducible ids.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn backend(&self) -> &S {
        &self.kv
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The active map, or the seed categories (not persisted) if nothing has
    /// been saved yet.
    pub fn get_quests_data(&self) -> Result<QuestMap, StoreError> {
        self.read_map(Shelf::Active)
    }

    /// The archive map, empty if nothing has been archived yet.
    pub fn get_archived_quests_data(&self) -> Result<QuestMap, StoreError> {
        self.read_map(Shelf::Archive)
    }

    /// Look a quest up in the active map first, then in the archive.
    pub fn find_quest(&self, quest_id: &str) -> Result<Option<LocatedQuest>, StoreError> {
        for shelf in [Shelf::Active, Shelf::Archive] {
            let map = self.read_map(shelf)?;
            if let Some(found) = quest_ops::find_quest(&map, quest_id) {
                return Ok(Some(LocatedQuest {
                    shelf,
                    category_id: found.category_id.to_string(),
                    category_name: found.category_name.to_string(),
                    quest: found.quest.clone(),
                }));
            }
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add a quest under the category named `category`, creating the category
    /// if needed. Inputs are not validated here.
    ///
    /// The archive is only consulted to keep new ids clear of archived ones;
    /// if it cannot be read the quest is still added.
    pub fn add_quest(&mut self, category: &str, description: &str) -> Result<AddedQuest, StoreError> {
        let _lock = self.kv.lock(self.lock_timeout)?;

        let mut active = self.read_map(Shelf::Active)?;
        let archive = self.read_map(Shelf::Archive).unwrap_or_else(|e| {
            log::warn!("archive unreadable, checking ids against active quests only: {}", e);
            QuestMap::new()
        });
        let added = quest_ops::add_quest(&mut self.rng, &mut active, &archive, category, description);
        self.write_map(Shelf::Active, &active)?;

        log::info!(
            "added quest {} to category {} ({})",
            added.quest.id,
            added.category_id,
            category
        );
        Ok(added)
    }

    /// Move a quest into the archive and mark it completed.
    ///
    /// An unknown id is not an error: it returns `Ok(None)` and nothing is
    /// written.
    pub fn move_quest_to_archive(&mut self, quest_id: &str) -> Result<Option<ArchivedQuest>, StoreError> {
        let _lock = self.kv.lock(self.lock_timeout)?;

        let mut active = self.read_map(Shelf::Active)?;
        let mut archive = self.read_map(Shelf::Archive)?;
        let Some(archived) = quest_ops::archive_quest(&mut active, &mut archive, quest_id) else {
            log::debug!("no active quest {}, nothing archived", quest_id);
            return Ok(None);
        };

        // Archive first: a failure between the two writes leaves a duplicate
        // rather than a lost quest.
        self.write_map(Shelf::Archive, &archive)?;
        self.write_map(Shelf::Active, &active)?;

        log::info!(
            "archived quest {} from category {}",
            archived.quest.id,
            archived.category_id
        );
        Ok(Some(archived))
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn read_map(&self, shelf: Shelf) -> Result<QuestMap, StoreError> {
        let key = shelf.key();
        let raw = self
            .kv
            .get(key)
            .map_err(|source| StoreError::Read { key, source })?;

        let Some(raw) = raw else {
            log::debug!("'{}' not stored yet, using defaults", key);
            return Ok(match shelf {
                Shelf::Active => seed_map(&self.seed),
                Shelf::Archive => QuestMap::new(),
            });
        };

        serde_json::from_str(&raw).map_err(|source| {
            if let Some(dir) = self.kv.recovery_dir() {
                log_recovery(
                    dir,
                    RecoveryEntry::new(RecoveryCategory::Parser, format!("could not parse '{}'", key))
                        .field("Key", key)
                        .field("Error", source.to_string())
                        .body(raw.clone()),
                );
            }
            StoreError::Parse { key, source }
        })
    }

    fn write_map(&mut self, shelf: Shelf, map: &QuestMap) -> Result<(), StoreError> {
        let key = shelf.key();
        let blob = serde_json::to_string(map).map_err(|source| StoreError::Serialize { key, source })?;
        log::debug!("writing '{}' ({} bytes)", key, blob.len());

        self.kv.set(key, &blob).map_err(|source| {
            if let Some(dir) = self.kv.recovery_dir() {
                log_recovery(
                    dir,
                    RecoveryEntry::new(RecoveryCategory::Write, format!("could not save '{}'", key))
                        .field("Key", key)
                        .field("Error", source.to_string())
                        .body(blob.clone()),
                );
            }
            StoreError::Write { key, source }
        })
    }
}
