//! # Umbra Core
//!
//! Ghost text rendering and host wiring for shadow comments.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────── ShadowComments ─────────────────────────┐
//! │                                                                  │
//! │  Command / HostEvent ──▶ AnnotationStore (get / set)             │
//! │                               │                                  │
//! │                               ▼                                  │
//! │                        OverlayRenderer ── style, visibility      │
//! │                               │                                  │
//! └───────────────────────────────┼──────────────────────────────────┘
//!                                 ▼
//!                   HostPort (apply_decorations, prompt, ...)
//! ```
//!
//! The core depends only on [`HostPort`]; it never sees a concrete editor.

pub mod command;
pub mod config;
pub mod document;
pub mod event;
pub mod extension;
pub mod host;
pub mod overlay;

pub use command::{Command, CommandContribution, CommandRegistry};
pub use config::{Config, ConfigError};
pub use document::Document;
pub use event::{EventBus, EventHandler, HostEvent};
pub use extension::ShadowComments;
pub use host::{EditorView, HostPort, PromptRequest};
pub use overlay::{Decoration, DecorationStyle, OverlayRenderer, Rgb, StyleId, Visibility};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Storage error: {0}")]
    Store(#[from] umbra_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
