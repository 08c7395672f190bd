use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::StoreConfig;

pub const CONFIG_FILE: &str = "questlog.toml";

/// Written by `ql init`. Mirrors the built-in defaults.
pub const CONFIG_TEMPLATE: &str = r#"[store]
# How long (ms) a writer waits for another ql process to finish
lock_timeout_ms = 5000

# --- Seed categories ---
# Used only until the first quest is saved.

[[seed]]
id = "cat1"
name = "Home Quests"

[[seed]]
id = "cat2"
name = "Work Quests"

[[seed]]
id = "cat3"
name = "Shopping Quests"

[[seed]]
id = "cat4"
name = "Event Quests"

[ui]
show_ids = true
show_empty_categories = true
"#;

/// Error type for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse questlog.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not edit questlog.toml: {0}")]
    EditError(#[from] toml_edit::TomlError),
    #[error("unknown setting '{0}' (expected one of: {keys})", keys = SETTING_KEYS.join(", "))]
    UnknownSetting(String),
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// Settings that `ql settings` can read and write
pub const SETTING_KEYS: &[&str] = &["store.lock_timeout_ms", "ui.show_ids", "ui.show_empty_categories"];

/// Read the config, returning both the parsed config and the raw document for
/// comment-preserving edits.
pub fn read_config(store_dir: &Path) -> Result<(StoreConfig, toml_edit::DocumentMut), ConfigError> {
    let path = store_dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    let config: StoreConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

pub fn write_config(store_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = store_dir.join(CONFIG_FILE);
    fs::write(&path, doc.to_string()).map_err(|e| ConfigError::WriteError { path, source: e })
}

/// Current value of a setting, as text
pub fn get_setting(config: &StoreConfig, key: &str) -> Result<String, ConfigError> {
    match key {
        "store.lock_timeout_ms" => Ok(config.store.lock_timeout_ms.to_string()),
        "ui.show_ids" => Ok(config.ui.show_ids.to_string()),
        "ui.show_empty_categories" => Ok(config.ui.show_empty_categories.to_string()),
        _ => Err(ConfigError::UnknownSetting(key.to_string())),
    }
}

/// Set a setting in the document, creating its table if missing.
pub fn set_setting(doc: &mut toml_edit::DocumentMut, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |expected: &'static str| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    };

    let item = match key {
        "store.lock_timeout_ms" => {
            let ms: i64 = value.parse().map_err(|_| invalid("a whole number of milliseconds"))?;
            if ms < 0 {
                return Err(invalid("a whole number of milliseconds"));
            }
            toml_edit::value(ms)
        }
        "ui.show_ids" | "ui.show_empty_categories" => {
            let flag: bool = value.parse().map_err(|_| invalid("true or false"))?;
            toml_edit::value(flag)
        }
        _ => return Err(ConfigError::UnknownSetting(key.to_string())),
    };

    let Some((table, field)) = key.split_once('.') else {
        return Err(ConfigError::UnknownSetting(key.to_string()));
    };
    if !doc.contains_key(table) {
        doc[table] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[table][field] = item;
    Ok(())
}
