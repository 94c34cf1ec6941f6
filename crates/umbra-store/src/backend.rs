//! Key-value persistence backends.
//!
//! A backend is the workspace-scoped state a host hands to the store. It only
//! knows about JSON values under string keys; the annotation shape lives in
//! [`crate::store`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::{Map, Value};

use crate::StoreResult;

/// Workspace-scoped key-value state.
pub trait StateBackend {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// Replaces the value stored under `key`.
    ///
    /// When this returns `Ok`, the value is durable and visible to `get`.
    /// When it returns `Err`, the previous value is still what `get` sees.
    fn update(&mut self, key: &str, value: Value) -> StoreResult<()>;
}

/// In-process backend. Nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    values: HashMap<String, Value>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn update(&mut self, key: &str, value: Value) -> StoreResult<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Backend persisted as a single JSON object on disk.
///
/// Reads are served from a snapshot that is refreshed whenever the file's
/// modification time or size changes, so writes made by another process
/// show up on the next `get`. Updates are written through: they go to a
/// sibling temp file which is then renamed over the original, so a crash
/// mid-write never leaves a truncated state file behind.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    snapshot: RefCell<Snapshot>,
}

/// What was last read from disk, and when.
#[derive(Debug, Default)]
struct Snapshot {
    stamp: Option<Stamp>,
    state: Map<String, Value>,
}

/// Modification time and size of the state file.
type Stamp = (SystemTime, u64);

impl JsonFileBackend {
    /// Opens (or lazily creates) the state file at `path`.
    ///
    /// A missing file is an empty state. A file that is not a JSON object,
    /// including one that is not valid UTF-8, is moved aside to
    /// `<path>.corrupt` (or `<path>.corrupt.N` if that is taken) and the
    /// state starts empty.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let stamp = stamp(&path);
        let state = read_state(&path)?;

        tracing::debug!("Opened state file {} ({} keys)", path.display(), state.len());
        Ok(Self {
            path,
            snapshot: RefCell::new(Snapshot { stamp, state }),
        })
    }

    /// Returns the location of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file if it changed since the last read.
    fn refresh(&self) {
        let current = stamp(&self.path);
        let mut snapshot = self.snapshot.borrow_mut();
        if current == snapshot.stamp {
            return;
        }

        match read_state(&self.path) {
            Ok(state) => {
                tracing::debug!("State file {} changed, reloaded", self.path.display());
                snapshot.state = state;
                snapshot.stamp = current;
            }
            Err(e) => tracing::warn!(
                "Failed to reload state file {}: {}",
                self.path.display(),
                e
            ),
        }
    }

    fn write(&self, state: &Map<String, Value>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = sibling(&self.path, ".tmp");
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StateBackend for JsonFileBackend {
    fn get(&self, key: &str) -> Option<Value> {
        self.refresh();
        self.snapshot.borrow().state.get(key).cloned()
    }

    fn update(&mut self, key: &str, value: Value) -> StoreResult<()> {
        self.refresh();
        let mut next = self.snapshot.get_mut().state.clone();
        next.insert(key.to_string(), value);
        self.write(&next)?;

        let snapshot = self.snapshot.get_mut();
        snapshot.state = next;
        snapshot.stamp = stamp(&self.path);
        Ok(())
    }
}

/// Reads the state file, moving it aside if it cannot be decoded.
fn read_state(path: &Path) -> StoreResult<Map<String, Value>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice::<Map<String, Value>>(&bytes) {
        Ok(state) => Ok(state),
        Err(e) => {
            let aside = corrupt_sibling(path);
            tracing::warn!(
                "State file {} is unreadable ({}), moving it to {}",
                path.display(),
                e,
                aside.display()
            );
            std::fs::rename(path, &aside)?;
            Ok(Map::new())
        }
    }
}

fn stamp(path: &Path) -> Option<Stamp> {
    let metadata = std::fs::metadata(path).ok()?;
    Some((metadata.modified().ok()?, metadata.len()))
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// First of `<path>.corrupt`, `<path>.corrupt.1`, ... that does not exist.
fn corrupt_sibling(path: &Path) -> PathBuf {
    let first = sibling(path, ".corrupt");
    if !first.exists() {
        return first;
    }
    (1u32..)
        .map(|n| sibling(path, &format!(".corrupt.{n}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_memory_backend() {
        let mut backend = MemoryBackend::new();
        assert!(backend.get("k").is_none());

        backend.update("k", json!({"a": 1})).unwrap();
        assert_eq!(backend.get("k"), Some(json!({"a": 1})));
    }

    #[test]
    fn test_json_file_missing_is_empty() {
        let dir = tempdir().unwrap();
        let backend = JsonFileBackend::open(dir.path().join("state.json")).unwrap();
        assert!(backend.get("anything").is_none());
        assert!(!backend.path().exists());
    }

    #[test]
    fn test_json_file_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut backend = JsonFileBackend::open(&path).unwrap();
        backend.update("k", json!({"x": "y"})).unwrap();
        drop(backend);

        let reopened = JsonFileBackend::open(&path).unwrap();
        assert_eq!(reopened.get("k"), Some(json!({"x": "y"})));
        assert!(!sibling(&path, ".tmp").exists());
    }

    #[test]
    fn test_json_file_corrupt_is_moved_aside() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let backend = JsonFileBackend::open(&path).unwrap();
        assert!(backend.get("k").is_none());
        assert!(!path.exists());

        let aside = sibling(&path, ".corrupt");
        assert_eq!(std::fs::read_to_string(aside).unwrap(), "{ not json");
    }

    #[test]
    fn test_json_file_failed_write_keeps_state() {
        let dir = tempdir().unwrap();
        // A directory where the state file should go makes the rename fail.
        let path = dir.path().join("state.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupant"), "").unwrap();

        let mut backend = JsonFileBackend {
            path: path.clone(),
            snapshot: RefCell::default(),
        };
        assert!(backend.update("k", json!(1)).is_err());
        assert!(backend.get("k").is_none());
    }

    #[test]
    fn test_json_file_invalid_utf8_is_moved_aside() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x7b]).unwrap();

        let backend = JsonFileBackend::open(&path).unwrap();
        assert!(backend.get("k").is_none());
        assert!(!path.exists());
        assert_eq!(
            std::fs::read(sibling(&path, ".corrupt")).unwrap(),
            vec![0xff, 0xfe, 0x00, 0x7b]
        );
    }

    #[test]
    fn test_json_file_earlier_corrupt_copy_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        std::fs::write(&path, "first").unwrap();
        JsonFileBackend::open(&path).unwrap();
        std::fs::write(&path, "second").unwrap();
        JsonFileBackend::open(&path).unwrap();
        std::fs::write(&path, "third").unwrap();
        JsonFileBackend::open(&path).unwrap();

        let read = |suffix: &str| std::fs::read_to_string(sibling(&path, suffix)).unwrap();
        assert_eq!(read(".corrupt"), "first");
        assert_eq!(read(".corrupt.1"), "second");
        assert_eq!(read(".corrupt.2"), "third");
    }

    #[test]
    fn test_json_file_sees_writes_from_another_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let reader = JsonFileBackend::open(&path).unwrap();
        assert!(reader.get("k").is_none());

        let mut writer = JsonFileBackend::open(&path).unwrap();
        writer.update("k", json!({"a": 1})).unwrap();
        assert_eq!(reader.get("k"), Some(json!({"a": 1})));

        writer.update("k", json!({"a": 1, "bb": 22})).unwrap();
        assert_eq!(reader.get("k"), Some(json!({"a": 1, "bb": 22})));
    }

    #[test]
    fn test_json_file_update_keeps_other_writers_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut first = JsonFileBackend::open(&path).unwrap();
        let mut second = JsonFileBackend::open(&path).unwrap();
        second.update("other", json!(true)).unwrap();
        first.update("k", json!(1)).unwrap();

        let reopened = JsonFileBackend::open(&path).unwrap();
        assert_eq!(reopened.get("other"), Some(json!(true)));
        assert_eq!(reopened.get("k"), Some(json!(1)));
    }
}
