//! The narrow port between shadow comments and a host editor.
//!
//! ## Learning: Ports and Adapters
//!
//! The core never touches a concrete editor. It asks the host for a snapshot
//! of the active editor, hands it decorations, and asks it to prompt the
//! user. Anything implementing [`HostPort`] can drive the core: the terminal
//! host in the `umbra` binary, a GUI editor, or a test double.

use umbra_store::FileKey;

use crate::overlay::{Decoration, DecorationStyle, StyleId};

/// Snapshot of the active editor handed to the renderer and commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorView {
    /// Identity of the document
    pub key: FileKey,

    /// Number of lines; an empty document has one line
    pub line_count: usize,

    /// Zero-based line of the primary caret
    pub caret_line: usize,
}

/// A request for one line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// Question shown to the user
    pub prompt: String,

    /// Hint shown while the input is empty
    pub placeholder: String,

    /// Initial value of the input
    pub value: String,
}

/// Operations a host editor supplies.
pub trait HostPort {
    /// Returns the active editor, or `None` when no document is focused.
    fn active_editor(&self) -> Option<EditorView>;

    /// Replaces every decoration of `style` on the document `key`.
    ///
    /// An empty list clears the document's overlay.
    fn apply_decorations(
        &mut self,
        key: &FileKey,
        style: &DecorationStyle,
        decorations: Vec<Decoration>,
    );

    /// Releases a style that will not be used again, along with any
    /// decorations still drawn with it.
    fn release_style(&mut self, style: StyleId);

    /// Asks the user for input.
    ///
    /// `None` means the prompt was cancelled, which is different from
    /// confirming an empty string.
    fn prompt(&mut self, request: &PromptRequest) -> Option<String>;
}
