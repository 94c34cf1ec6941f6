//! The annotation store.
//!
//! All annotations of a workspace live under one backend key as nested
//! string-keyed objects:
//!
//! ```json
//! {
//!   "file:///src/main.rs": { "4": "check null", "12": "why clone?" }
//! }
//! ```
//!
//! The store is copy-on-read: [`AnnotationStore::get`] hands out an owned
//! [`LineMap`], and the only way to change state is [`AnnotationStore::set`],
//! which persists before returning.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::backend::{MemoryBackend, StateBackend};
use crate::key::{FileKey, LineNumber};
use crate::{StoreError, StoreResult};

/// Backend key holding the whole annotation mapping.
pub const STORAGE_KEY: &str = "shadowComments_data";

/// Comments of one file, ordered by line.
pub type LineMap = BTreeMap<LineNumber, String>;

/// Comments of every annotated file.
pub type CommentMap = BTreeMap<FileKey, LineMap>;

/// The persisted shape: line numbers are stringified.
type RawCommentMap = BTreeMap<String, BTreeMap<String, String>>;

/// Line-addressed annotation storage.
///
/// ## Invariants
///
/// - A file is present only while it has at least one comment.
/// - A comment is present only while its text has non-whitespace content.
pub trait AnnotationStore {
    /// Returns a copy of the comments for `key`; empty if there are none.
    fn get(&self, key: &FileKey) -> LineMap;

    /// Sets or clears the comment on `line` of `key`.
    ///
    /// Text that is empty after trimming deletes the comment, and the file
    /// entry with it once no comments remain. Other text is stored verbatim.
    fn set(&mut self, key: &FileKey, line: LineNumber, text: &str) -> StoreResult<()>;

    /// Returns every file that currently has comments.
    fn files(&self) -> Vec<FileKey>;
}

/// [`AnnotationStore`] persisted through a [`StateBackend`].
#[derive(Debug)]
pub struct PersistentStore<B> {
    backend: B,
}

impl PersistentStore<MemoryBackend> {
    /// Creates a store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: StateBackend> PersistentStore<B> {
    /// Creates a store over `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Reads the full mapping from the backend.
    pub fn load(&self) -> CommentMap {
        match self.backend.get(STORAGE_KEY) {
            Some(value) => decode(value),
            None => CommentMap::new(),
        }
    }

    fn save(&mut self, comments: &CommentMap) -> StoreResult<()> {
        let value = encode(comments)?;
        self.backend.update(STORAGE_KEY, value)
    }
}

impl<B: StateBackend> AnnotationStore for PersistentStore<B> {
    fn get(&self, key: &FileKey) -> LineMap {
        self.load().remove(key).unwrap_or_default()
    }

    fn set(&mut self, key: &FileKey, line: LineNumber, text: &str) -> StoreResult<()> {
        let mut comments = self.load();

        if text.trim().is_empty() {
            if let Some(lines) = comments.get_mut(key) {
                lines.remove(&line);
                if lines.is_empty() {
                    comments.remove(key);
                }
            }
            tracing::debug!("Cleared comment at {}:{}", key, line);
        } else {
            comments
                .entry(key.clone())
                .or_default()
                .insert(line, text.to_string());
            tracing::debug!("Stored comment at {}:{}", key, line);
        }

        self.save(&comments)
    }

    fn files(&self) -> Vec<FileKey> {
        self.load().into_keys().collect()
    }
}

/// Decodes the persisted value, dropping anything that does not fit.
///
/// A value that is not an object decodes as an empty mapping. Inside it,
/// files that are not objects, line keys that are not canonical integers and
/// texts that are not non-blank strings are skipped one by one.
fn decode(value: Value) -> CommentMap {
    let Value::Object(files) = value else {
        tracing::warn!("Ignoring malformed annotation data: expected an object");
        return CommentMap::new();
    };

    let mut comments = CommentMap::new();
    for (file, raw_lines) in files {
        let Value::Object(raw_lines) = raw_lines else {
            tracing::warn!("Skipping comments of {}: expected an object", file);
            continue;
        };

        let mut lines = LineMap::new();
        for (raw, text) in raw_lines {
            let Value::String(text) = text else {
                tracing::warn!("Skipping comment {} in {}: text is not a string", raw, file);
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }
            match decode_line(&raw) {
                Ok(line) => {
                    lines.insert(line, text);
                }
                Err(e) => tracing::warn!("Skipping comment in {}: {}", file, e),
            }
        }
        if !lines.is_empty() {
            comments.insert(FileKey::from_uri(file), lines);
        }
    }
    comments
}

/// Parses a persisted line key. Only the form [`encode`] writes is accepted,
/// so `"01"` cannot shadow `"1"`.
fn decode_line(raw: &str) -> StoreResult<LineNumber> {
    let line = raw.parse::<LineNumber>()?;
    if line.to_string() != raw {
        return Err(StoreError::InvalidLine(raw.to_string()));
    }
    Ok(line)
}

fn encode(comments: &CommentMap) -> StoreResult<Value> {
    let raw: RawCommentMap = comments
        .iter()
        .map(|(file, lines)| {
            let lines = lines
                .iter()
                .map(|(line, text)| (line.to_string(), text.clone()))
                .collect();
            (file.as_str().to_string(), lines)
        })
        .collect();

    Ok(serde_json::to_value(raw)?)
}
