//! Documents as the overlay sees them.
//!
//! ## Learning: Composition over Inheritance
//!
//! `Document` composes a `ropey::Rope` with the file's identity. The rope
//! gives cheap line counts on every render, which is all the overlay needs.

use std::path::{Path, PathBuf};

use ropey::Rope;
use umbra_store::FileKey;

use crate::host::EditorView;
use crate::{CoreError, CoreResult};

/// An open text document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Identity used to look up comments
    key: FileKey,

    /// Backing file, if any
    path: Option<PathBuf>,

    /// Current content
    text: Rope,
}

impl Document {
    /// Creates a document from in-memory text.
    pub fn new(key: FileKey, text: &str) -> Self {
        Self {
            key,
            path: None,
            text: Rope::from_str(text),
        }
    }

    /// Opens a document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CoreError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let key = FileKey::from_path(path)?;

        Ok(Self {
            key,
            path: Some(path.to_path_buf()),
            text: Rope::from_str(&content),
        })
    }

    /// Re-reads the backing file. Returns false for documents without one.
    pub fn reload(&mut self) -> CoreResult<bool> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        let content = std::fs::read_to_string(path)?;
        self.text = Rope::from_str(&content);
        Ok(true)
    }

    /// Returns the document's identity.
    pub fn key(&self) -> &FileKey {
        &self.key
    }

    /// Returns the number of lines.
    ///
    /// A trailing newline starts a new, empty line, so `"a\n"` has two.
    pub fn line_count(&self) -> usize {
        self.text.len_lines()
    }

    /// Returns a line without its line terminator.
    pub fn line(&self, index: usize) -> Option<String> {
        if index >= self.line_count() {
            return None;
        }
        let line = self.text.line(index).to_string();
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Iterates over lines without their terminators.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.line_count()).filter_map(|i| self.line(i))
    }

    /// Snapshot with the caret on `caret_line`, clamped to the document.
    pub fn view(&self, caret_line: usize) -> EditorView {
        let line_count = self.line_count();
        EditorView {
            key: self.key.clone(),
            line_count,
            caret_line: caret_line.min(line_count.saturating_sub(1)),
        }
    }
}
