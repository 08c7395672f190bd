use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use crate::io::lock::try_lock;

/// Size past which the log is trimmed before the next append (1 MB).
const MAX_LOG_SIZE: u64 = 1_048_576;

/// Default number of days before entries are prunable.
pub const PRUNE_AGE_DAYS: i64 = 30;

/// Written once at the top of a new recovery log.
const FILE_HEADER: &str = "\
<!-- questlog recovery log: data that could not be read or saved normally.
     View with: ql recovery
     Prune old entries: ql recovery prune -->

---
";

const HEADER_SEPARATOR: &str = " | ";

/// Category of a recovery entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// A persisted blob that failed to parse
    Parser,
    /// A blob that failed to persist
    Write,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryCategory::Parser => write!(f, "parser"),
            RecoveryCategory::Write => write!(f, "write"),
        }
    }
}

impl RecoveryCategory {
    pub fn parse_category(s: &str) -> Option<Self> {
        match s {
            "parser" => Some(RecoveryCategory::Parser),
            "write" => Some(RecoveryCategory::Write),
            _ => None,
        }
    }
}

/// A single entry in the recovery log.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

pub fn recovery_log_path(store_dir: &Path) -> PathBuf {
    store_dir.join(".recovery.log")
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl RecoveryEntry {
    pub fn new(category: RecoveryCategory, description: impl Into<String>) -> Self {
        RecoveryEntry {
            timestamp: Utc::now(),
            category,
            description: description.into(),
            fields: Vec::new(),
            body: String::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Markdown block as stored in the log
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {}{}{}: {}\n\n",
            self.timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            HEADER_SEPARATOR,
            self.category,
            self.description,
        );
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        if !self.body.is_empty() {
            out.push_str("\n```text\n");
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }
        out.push_str("\n---\n");
        out
    }

    /// JSON value for `ql recovery --json`
    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "category": self.category.to_string(),
            "description": self.description,
            "fields": fields,
            "body": self.body,
        })
    }
}

/// Append an entry to the log. Failures are logged and otherwise ignored so
/// they never mask the error being recovered from.
///
/// An entry identical to the newest one (apart from its timestamp) is not
/// written again, so re-reading the same corrupt blob adds nothing.
pub fn log_recovery(store_dir: &Path, entry: RecoveryEntry) {
    let path = recovery_log_path(store_dir);
    if is_repeat_of_newest(&path, &entry) {
        log::debug!("{} entry already in recovery log: {}", entry.category, entry.description);
        return;
    }

    log::warn!(
        "writing {} entry to recovery log: {}",
        entry.category,
        entry.description
    );
    if let Ok(meta) = std::fs::metadata(&path)
        && meta.len() > MAX_LOG_SIZE
    {
        try_inline_trim(&path, MAX_LOG_SIZE);
    }
    if let Err(e) = append_entry(&path, &entry) {
        log::error!("could not write to recovery log: {}", e);
    }
}

fn is_repeat_of_newest(path: &Path, entry: &RecoveryEntry) -> bool {
    let Ok(content) = std::fs::read_to_string(path) else {
        return false;
    };
    parse_entries(&content).last().is_some_and(|newest| {
        newest.category == entry.category
            && newest.description == entry.description
            && newest.fields == entry.fields
            && newest.body == entry.body.trim_end_matches('\n')
    })
}

fn append_entry(path: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    let needs_header = std::fs::metadata(path).map_or(true, |m| m.len() == 0);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())
}

/// Shrink the log below `max_len` bytes: entries past [`PRUNE_AGE_DAYS`] go
/// first, then the oldest remaining ones. Skipped if another process holds
/// the log.
fn try_inline_trim(path: &Path, max_len: u64) {
    let Ok(mut file) = OpenOptions::new().read(true).write(true).open(path) else {
        return;
    };
    if try_lock(&file).is_err() {
        return;
    }

    let mut content = String::new();
    if file.read_to_string(&mut content).is_err() {
        return;
    }

    let cutoff = Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS);
    let mut kept: Vec<String> = parse_entries(&content)
        .into_iter()
        .filter(|e| e.timestamp >= cutoff)
        .map(|e| e.to_markdown())
        .collect();

    let mut len = FILE_HEADER.len() + kept.iter().map(String::len).sum::<usize>();
    let mut dropped = 0;
    while len as u64 > max_len && dropped < kept.len() {
        len -= kept[dropped].len();
        dropped += 1;
    }
    kept.drain(..dropped);

    let mut out = FILE_HEADER.to_string();
    out.extend(kept);
    if out.len() >= content.len() {
        return;
    }

    // Rewritten in place so appenders holding the file keep the same inode
    let rewrite = file
        .seek(SeekFrom::Start(0))
        .and_then(|_| file.set_len(0))
        .and_then(|_| file.write_all(out.as_bytes()));
    match rewrite {
        Ok(()) => log::info!("trimmed recovery log from {} to {} bytes", content.len(), out.len()),
        Err(e) => log::error!("could not trim recovery log: {}", e),
    }
}

/// Entries from the log, most recent first.
pub fn read_recovery_entries(store_dir: &Path, limit: Option<usize>) -> Vec<RecoveryEntry> {
    let content = match std::fs::read_to_string(recovery_log_path(store_dir)) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    let mut entries = parse_entries(&content);
    entries.reverse();
    if let Some(n) = limit {
        entries.truncate(n);
    }
    entries
}

/// Drop entries older than `before` (default: [`PRUNE_AGE_DAYS`] ago), or all
/// entries. Returns how many were removed.
pub fn prune_recovery(
    store_dir: &Path,
    before: Option<DateTime<Utc>>,
    all: bool,
) -> io::Result<usize> {
    let path = recovery_log_path(store_dir);
    if !path.exists() {
        return Ok(0);
    }
    let content = std::fs::read_to_string(&path)?;
    let entries = parse_entries(&content);
    let cutoff = before.unwrap_or_else(|| Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS));

    let (kept, dropped): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .partition(|e| !all && e.timestamp >= cutoff);

    let mut out = FILE_HEADER.to_string();
    for entry in &kept {
        out.push_str(&entry.to_markdown());
    }
    atomic_write(&path, out.as_bytes())?;
    Ok(dropped.len())
}

fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    let mut entries = Vec::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let Some(header) = line.strip_prefix("## ") else {
            continue;
        };
        let Some((timestamp, category, description)) = parse_entry_header(header) else {
            continue;
        };

        let mut fields = Vec::new();
        let mut body_lines: Vec<&str> = Vec::new();
        let mut in_body = false;

        for line in lines.by_ref() {
            if in_body {
                if line == "```" {
                    in_body = false;
                } else {
                    body_lines.push(line);
                }
                continue;
            }
            if line == "---" {
                break;
            }
            if line.starts_with("```") {
                in_body = true;
                continue;
            }
            if let Some((key, value)) = line.trim().split_once(": ") {
                fields.push((key.to_string(), value.to_string()));
            }
        }

        entries.push(RecoveryEntry {
            timestamp,
            category,
            description,
            fields,
            body: body_lines.join("\n"),
        });
    }

    entries
}

fn parse_entry_header(header: &str) -> Option<(DateTime<Utc>, RecoveryCategory, String)> {
    let (timestamp, rest) = header.split_once(HEADER_SEPARATOR)?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .ok()?
        .with_timezone(&Utc);
    let (category, description) = rest.split_once(": ")?;
    let category = RecoveryCategory::parse_category(category)?;
    Some((timestamp, category, description.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn entry_at(ts: &str, description: &str) -> RecoveryEntry {
        let mut entry = RecoveryEntry::new(RecoveryCategory::Write, description)
            .field("Key", "quests")
            .body("{\"cat1\":{}}");
        entry.timestamp = DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc);
        entry
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("quests.json");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
    }

    #[test]
    fn test_append_and_read_back() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), entry_at("2026-01-01T10:00:00Z", "first"));
        log_recovery(
            tmp.path(),
            RecoveryEntry::new(RecoveryCategory::Parser, "corrupt blob")
                .field("Key", "archive")
                .body("{not json\nsecond line"),
        );

        let content = std::fs::read_to_string(recovery_log_path(tmp.path())).unwrap();
        assert!(content.starts_with("<!-- questlog recovery log"));

        let entries = read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].category, RecoveryCategory::Parser);
        assert_eq!(entries[0].body, "{not json\nsecond line");
        assert_eq!(entries[0].fields, vec![("Key".to_string(), "archive".to_string())]);
        assert_eq!(entries[1], entry_at("2026-01-01T10:00:00Z", "first"));

        assert_eq!(read_recovery_entries(tmp.path(), Some(1)).len(), 1);
    }

    #[test]
    fn test_missing_log_reads_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(read_recovery_entries(tmp.path(), None).is_empty());
        assert_eq!(prune_recovery(tmp.path(), None, false).unwrap(), 0);
    }

    #[test]
    fn test_prune_before_cutoff() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), entry_at("2025-01-01T00:00:00Z", "old"));
        log_recovery(tmp.path(), entry_at("2026-06-01T00:00:00Z", "new"));

        let cutoff = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(prune_recovery(tmp.path(), Some(cutoff), false).unwrap(), 1);

        let left = read_recovery_entries(tmp.path(), None);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].description, "new");
    }

    #[test]
    fn test_prune_all() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), entry_at("2026-06-01T00:00:00Z", "a"));
        log_recovery(tmp.path(), entry_at("2026-06-02T00:00:00Z", "b"));
        assert_eq!(prune_recovery(tmp.path(), None, true).unwrap(), 2);
        assert!(read_recovery_entries(tmp.path(), None).is_empty());
    }

    #[test]
    fn test_repeated_entry_is_written_once() {
        let tmp = TempDir::new().unwrap();
        let corrupt = || {
            RecoveryEntry::new(RecoveryCategory::Parser, "could not parse 'quests'")
                .field("Key", "quests")
                .body("{not json")
        };
        for _ in 0..5 {
            log_recovery(tmp.path(), corrupt());
        }
        assert_eq!(read_recovery_entries(tmp.path(), None).len(), 1);

        // A different blob is new information
        log_recovery(tmp.path(), corrupt().body("{still not json"));
        log_recovery(tmp.path(), corrupt());
        assert_eq!(read_recovery_entries(tmp.path(), None).len(), 3);
    }

    #[test]
    fn test_inline_trim_keeps_newest_under_limit() {
        let tmp = TempDir::new().unwrap();
        let now = Utc::now();
        for i in 0..20 {
            let mut entry = RecoveryEntry::new(RecoveryCategory::Write, format!("entry {}", i))
                .body("x".repeat(200));
            entry.timestamp = now - chrono::Duration::minutes(20 - i);
            log_recovery(tmp.path(), entry);
        }
        let path = recovery_log_path(tmp.path());
        let before = std::fs::metadata(&path).unwrap().len();

        try_inline_trim(&path, 1500);

        let after = std::fs::metadata(&path).unwrap().len();
        assert!(after <= 1500, "log is {} bytes", after);
        assert!(after < before);
        let entries = read_recovery_entries(tmp.path(), None);
        assert!(!entries.is_empty());
        assert_eq!(entries[0].description, "entry 19");
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("<!-- questlog"));
    }

    #[test]
    fn test_inline_trim_drops_expired_first() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), entry_at("2020-01-01T00:00:00Z", "ancient"));
        log_recovery(tmp.path(), RecoveryEntry::new(RecoveryCategory::Write, "fresh"));
        let path = recovery_log_path(tmp.path());

        try_inline_trim(&path, MAX_LOG_SIZE);

        let entries = read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "fresh");
    }

    #[test]
    fn test_json_shape() {
        let json = entry_at("2026-01-01T10:00:00Z", "first").to_json();
        assert_eq!(json["category"], "write");
        assert_eq!(json["timestamp"], "2026-01-01T10:00:00Z");
        assert_eq!(json["fields"]["Key"], "quests");
    }
}
