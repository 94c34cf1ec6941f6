//! Identity types for annotations.
//!
//! ## Learning: Newtypes as Keys
//!
//! `FileKey` and `LineNumber` wrap a `String` and a `u32`. The wrappers cost
//! nothing at runtime but stop a raw path from being used where a canonical
//! URI is required, and make negative line numbers unrepresentable.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use url::Url;

use crate::{StoreError, StoreResult};

/// Stable, OS-path-agnostic identity of a file.
///
/// Keys built from paths are `file://` URLs of the canonical path, so
/// `C:\src\main.rs` and `/src/main.rs` style paths both end up as URL strings
/// with forward slashes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileKey(String);

impl FileKey {
    /// Derives a key from a filesystem path.
    ///
    /// Existing files are canonicalized (symlinks resolved). Paths that do
    /// not exist yet are made absolute against the current directory.
    pub fn from_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let absolute = match std::fs::canonicalize(path) {
            Ok(p) => p,
            Err(_) => std::path::absolute(path)?,
        };

        Url::from_file_path(&absolute)
            .map(|url| Self(url.to_string()))
            .map_err(|()| StoreError::InvalidPath(absolute.display().to_string()))
    }

    /// Wraps a URI the host already computed.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Zero-based line index within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineNumber(u32);

impl LineNumber {
    pub const fn new(line: u32) -> Self {
        Self(line)
    }

    /// Returns the line as an index usable against a document.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for LineNumber {
    fn from(line: u32) -> Self {
        Self(line)
    }
}

impl TryFrom<usize> for LineNumber {
    type Error = StoreError;

    fn try_from(line: usize) -> Result<Self, Self::Error> {
        u32::try_from(line)
            .map(Self)
            .map_err(|_| StoreError::InvalidLine(line.to_string()))
    }
}

impl fmt::Display for LineNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LineNumber {
    type Err = StoreError;

    /// Parses the stringified form used in the persisted blob.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| StoreError::InvalidLine(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_key_is_file_url() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.rs");
        std::fs::write(&path, "fn main() {}").unwrap();

        let key = FileKey::from_path(&path).unwrap();
        assert!(key.as_str().starts_with("file://"));
        assert!(key.as_str().ends_with("/main.rs"));
        assert!(!key.as_str().contains('\\'));
    }

    #[test]
    fn test_file_key_is_stable_across_spellings() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        let path = dir.path().join("src").join("lib.rs");
        std::fs::write(&path, "").unwrap();

        let direct = FileKey::from_path(&path).unwrap();
        let dotted = FileKey::from_path(dir.path().join("src").join(".").join("lib.rs")).unwrap();
        assert_eq!(direct, dotted);
    }

    #[test]
    fn test_file_key_for_missing_file() {
        let dir = tempdir().unwrap();
        let key = FileKey::from_path(dir.path().join("not-yet.txt")).unwrap();
        assert!(key.as_str().ends_with("/not-yet.txt"));
    }

    #[test]
    fn test_line_number_parsing() {
        assert_eq!("12".parse::<LineNumber>().unwrap(), LineNumber::new(12));
        assert!("-1".parse::<LineNumber>().is_err());
        assert!("twelve".parse::<LineNumber>().is_err());
        assert!(" 3".parse::<LineNumber>().is_err());
    }

    #[test]
    fn test_line_number_display_round_trips() {
        let line = LineNumber::new(42);
        assert_eq!(line.to_string().parse::<LineNumber>().unwrap(), line);
        assert_eq!(line.index(), 42);
    }
}
