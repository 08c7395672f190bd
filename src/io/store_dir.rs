use std::fs;
use std::path::{Path, PathBuf};

use crate::io::config_io::{self, ConfigError};
use crate::io::kv::FileStore;
use crate::io::quest_store::QuestStore;
use crate::model::config::StoreConfig;

/// Name of the directory holding a store
pub const STORE_DIR_NAME: &str = ".questlog";

/// Error type for locating and opening a store directory
#[derive(Debug, thiserror::Error)]
pub enum StoreDirError {
    #[error("no questlog store found (looked for .questlog/ from {0} upward); run `ql init`")]
    NotFound(PathBuf),
    #[error("{0} is not a questlog store: missing questlog.toml")]
    MissingConfig(PathBuf),
    #[error("a questlog store already exists at {0} (use --force to reset its config)")]
    AlreadyExists(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// An opened store directory: its config and the quest store over it
pub struct OpenStore {
    pub dir: PathBuf,
    pub config: StoreConfig,
    pub quests: QuestStore<FileStore>,
}

fn is_store_dir(dir: &Path) -> bool {
    dir.is_dir() && dir.join(config_io::CONFIG_FILE).exists()
}

/// Walk up from `start` looking for a `.questlog/` directory.
/// Returns the path of the `.questlog/` directory itself.
pub fn discover_store(start: &Path) -> Result<PathBuf, StoreDirError> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(STORE_DIR_NAME);
        if is_store_dir(&candidate) {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(StoreDirError::NotFound(start.to_path_buf()));
        }
    }
}

/// Resolve an explicit `-C` directory: either the `.questlog/` directory
/// itself or a directory containing one.
pub fn resolve_store(dir: &Path) -> Result<PathBuf, StoreDirError> {
    if is_store_dir(dir) {
        return Ok(dir.to_path_buf());
    }
    let nested = dir.join(STORE_DIR_NAME);
    if is_store_dir(&nested) {
        return Ok(nested);
    }
    Err(StoreDirError::MissingConfig(dir.to_path_buf()))
}

/// Load the config and build a file-backed quest store.
pub fn open_store(store_dir: &Path) -> Result<OpenStore, StoreDirError> {
    if !is_store_dir(store_dir) {
        return Err(StoreDirError::MissingConfig(store_dir.to_path_buf()));
    }
    let (config, _) = config_io::read_config(store_dir)?;
    log::debug!("opened store at {}", store_dir.display());
    let quests = QuestStore::new(FileStore::new(store_dir), &config);
    Ok(OpenStore {
        dir: store_dir.to_path_buf(),
        config,
        quests,
    })
}

/// Create `<root>/.questlog/` with a default config. Existing quest data is
/// never touched; with `force` an existing config is rewritten.
pub fn init_store(root: &Path, force: bool) -> Result<PathBuf, StoreDirError> {
    let store_dir = root.join(STORE_DIR_NAME);
    if is_store_dir(&store_dir) && !force {
        return Err(StoreDirError::AlreadyExists(store_dir));
    }
    fs::create_dir_all(&store_dir)?;
    fs::write(store_dir.join(config_io::CONFIG_FILE), config_io::CONFIG_TEMPLATE)?;
    log::info!("initialized store at {}", store_dir.display());
    Ok(store_dir)
}
