use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};

/// Feed id -> last delivered link.
pub type FeedState = BTreeMap<String, String>;

/// Key used by the single-feed state format.
const LEGACY_KEY: &str = "last_link";

/// Durable per-feed checkpoints.
///
/// The whole map lives in one JSON object (`{ "<feed url>": "<last link>" }`)
/// and every write replaces the file through a temp file + rename, so readers
/// never see a half-written map.
pub struct StateStore {
    path: PathBuf,
    legacy_feed: Option<String>,
    write_lock: Mutex<()>,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            legacy_feed: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Attribute a legacy `{"last_link": ...}` file to `feed_id`.
    pub fn with_legacy_feed(mut self, feed_id: impl Into<String>) -> Self {
        self.legacy_feed = Some(feed_id.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted map. Missing or malformed files yield an empty map.
    pub fn load(&self) -> FeedState {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return FeedState::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Error reading state file");
                return FeedState::new();
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "State file is not valid JSON, starting fresh");
                return FeedState::new();
            }
        };

        let serde_json::Value::Object(map) = value else {
            warn!(path = %self.path.display(), "State file is not a JSON object, starting fresh");
            return FeedState::new();
        };

        let mut state: FeedState = map
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::String(link) => Some((key, link)),
                other => {
                    debug!(feed = %key, value = %other, "Ignoring non-string checkpoint");
                    None
                }
            })
            .collect();

        self.migrate_legacy(&mut state);
        state
    }

    fn migrate_legacy(&self, state: &mut FeedState) {
        let Some(feed_id) = &self.legacy_feed else {
            return;
        };
        let Some(link) = state.remove(LEGACY_KEY) else {
            return;
        };
        if state.contains_key(feed_id) {
            debug!(feed = %feed_id, "Dropping stale legacy last_link, feed already has a checkpoint");
            return;
        }
        info!(feed = %feed_id, "Migrating legacy last_link checkpoint");
        state.insert(feed_id.clone(), link);
    }

    /// Replaces the persisted map as a whole.
    pub fn save(&self, state: &FeedState) -> AppResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, state)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| AppError::Io(e.error))?;
        Ok(())
    }

    pub fn checkpoint(state: &FeedState, feed_id: &str) -> Option<String> {
        state.get(feed_id).cloned()
    }

    /// Re-reads the file, records `link` for `feed_id` and writes the map back.
    pub fn set_checkpoint(&self, feed_id: &str, link: &str) -> AppResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut state = self.load();
        state.insert(feed_id.to_string(), link.to_string());
        self.save(&state)?;
        debug!(feed = %feed_id, link = %link, "Checkpoint updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> StateStore {
        StateStore::new(dir.path().join("state.json"))
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_malformed_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{ not json").unwrap();
        assert!(store.load().is_empty());

        std::fs::write(store.path(), "[\"a\", \"b\"]").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_set_checkpoint_keeps_other_feeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.set_checkpoint("https://feed/a", "https://a/1").unwrap();
        store.set_checkpoint("https://feed/b", "https://b/1").unwrap();
        store.set_checkpoint("https://feed/a", "https://a/2").unwrap();

        let state = store.load();
        assert_eq!(state.len(), 2);
        assert_eq!(
            StateStore::checkpoint(&state, "https://feed/a").as_deref(),
            Some("https://a/2")
        );
        assert_eq!(
            StateStore::checkpoint(&state, "https://feed/b").as_deref(),
            Some("https://b/1")
        );
    }

    #[test]
    fn test_external_edits_between_writes_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_checkpoint("https://feed/a", "https://a/1").unwrap();

        std::fs::write(
            store.path(),
            r#"{"https://feed/a": "https://a/1", "https://feed/manual": "https://m/9"}"#,
        )
        .unwrap();
        store.set_checkpoint("https://feed/a", "https://a/2").unwrap();

        let state = store.load();
        assert_eq!(state.get("https://feed/manual").map(String::as_str), Some("https://m/9"));
    }

    #[test]
    fn test_non_string_values_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"a": "x", "b": 3, "c": null}"#).unwrap();

        let state = store.load();
        assert_eq!(state.len(), 1);
        assert_eq!(state.get("a").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_legacy_file_is_attributed_to_first_feed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).with_legacy_feed("https://feed/a");
        std::fs::write(store.path(), r#"{"last_link": "https://a/7"}"#).unwrap();

        let state = store.load();
        assert_eq!(state.get("https://feed/a").map(String::as_str), Some("https://a/7"));
        assert!(!state.contains_key("last_link"));

        store.set_checkpoint("https://feed/b", "https://b/1").unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("last_link"));
        assert!(raw.contains("https://a/7"));
    }

    #[test]
    fn test_stale_legacy_key_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).with_legacy_feed("https://feed/a");
        std::fs::write(
            store.path(),
            r#"{"last_link": "https://a/old", "https://feed/a": "https://a/9"}"#,
        )
        .unwrap();

        let state = store.load();
        assert_eq!(state.get("https://feed/a").map(String::as_str), Some("https://a/9"));
        assert!(!state.contains_key("last_link"));

        store.set_checkpoint("https://feed/b", "https://b/1").unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("last_link"));
        assert!(!raw.contains("https://a/old"));
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_checkpoint("https://feed/a", "https://a/1").unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
