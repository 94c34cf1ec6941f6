//! # Umbra Store
//!
//! Persistent storage for shadow comments: private, per-line notes that are
//! shown next to code but never written into the file.
//!
//! ## Layers
//!
//! ```text
//! AnnotationStore (get / set / files)
//!        │
//! PersistentStore ── encodes FileKey -> LineMap as nested JSON objects
//!        │
//! StateBackend   ── MemoryBackend | JsonFileBackend
//! ```
//!
//! Hosts inject whichever backend fits; tests use [`MemoryBackend`].

mod backend;
mod key;
mod store;

pub use backend::{JsonFileBackend, MemoryBackend, StateBackend};
pub use key::{FileKey, LineNumber};
pub use store::{AnnotationStore, CommentMap, LineMap, PersistentStore, STORAGE_KEY};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or persisting annotations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid line number: {0}")]
    InvalidLine(String),

    #[error("Path cannot be turned into a file URI: {0}")]
    InvalidPath(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
