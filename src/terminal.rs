//! Terminal host: implements [`HostPort`] on top of stdin/stdout.
//!
//! Documents are read from disk, decorations are kept per document and drawn
//! after the line they are anchored to when the document is printed.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{BufRead, Write};

use crossterm::style::{Color, Stylize};
use umbra_core::{
    Decoration, DecorationStyle, Document, EditorView, HostPort, PromptRequest, StyleId,
};
use umbra_store::FileKey;

/// Where prompt answers come from.
pub enum PromptSource {
    /// Answer every prompt with this text
    Answer(String),
    /// Read one line per prompt; end of input cancels
    Reader(Box<dyn BufRead>),
}

/// Decorations drawn on one document.
#[derive(Debug, Clone)]
struct Overlay {
    style: DecorationStyle,
    decorations: Vec<Decoration>,
}

/// A host editor living in the terminal.
pub struct TerminalHost {
    documents: HashMap<FileKey, Document>,
    active: Option<FileKey>,
    caret_line: usize,
    overlays: HashMap<FileKey, Overlay>,
    prompt: PromptSource,
}

impl TerminalHost {
    pub fn new(prompt: PromptSource) -> Self {
        Self {
            documents: HashMap::new(),
            active: None,
            caret_line: 0,
            overlays: HashMap::new(),
            prompt,
        }
    }

    /// Opens `document` and focuses it with the caret on the first line.
    pub fn open(&mut self, document: Document) -> FileKey {
        let key = document.key().clone();
        self.documents.insert(key.clone(), document);
        self.active = Some(key.clone());
        self.caret_line = 0;
        key
    }

    /// Moves the caret of the active document.
    pub fn set_caret(&mut self, line: usize) {
        self.caret_line = line;
    }

    /// Returns an open document for editing.
    pub fn document_mut(&mut self, key: &FileKey) -> Option<&mut Document> {
        self.documents.get_mut(key)
    }

    /// Decorations currently drawn on `key`.
    pub fn decorations(&self, key: &FileKey) -> &[Decoration] {
        self.overlays
            .get(key)
            .map(|overlay| overlay.decorations.as_slice())
            .unwrap_or(&[])
    }

    /// Prints a document with its ghost text, one numbered line per row.
    pub fn render_document(&self, key: &FileKey, color: bool) -> Option<String> {
        let document = self.documents.get(key)?;
        let overlay = self.overlays.get(key);
        let by_line: HashMap<usize, &Decoration> = overlay
            .map(|o| o.decorations.iter().map(|d| (d.line, d)).collect())
            .unwrap_or_default();

        let width = document.line_count().to_string().len();
        let mut out = String::new();
        for (index, line) in document.lines().enumerate() {
            let _ = write!(out, "{:>width$} │ {}", index + 1, line);
            if let (Some(decoration), Some(overlay)) = (by_line.get(&index), overlay) {
                out.push_str(&ghost_text(decoration, &overlay.style, color));
            }
            out.push('\n');
        }
        Some(out)
    }
}

/// Margin plus styled decoration text.
fn ghost_text(decoration: &Decoration, style: &DecorationStyle, color: bool) -> String {
    let margin = " ".repeat(style.margin_em as usize);
    let text = single_line(&decoration.text);
    if !color {
        return format!("{margin}{text}");
    }

    let rgb = Color::Rgb {
        r: style.color.r,
        g: style.color.g,
        b: style.color.b,
    };
    format!("{margin}{}", text.as_str().with(rgb).italic())
}

/// Escapes line breaks so ghost text stays on its anchor row.
fn single_line(text: &str) -> String {
    text.replace('\r', "\\r").replace('\n', "\\n")
}

impl HostPort for TerminalHost {
    fn active_editor(&self) -> Option<EditorView> {
        let key = self.active.as_ref()?;
        self.documents
            .get(key)
            .map(|document| document.view(self.caret_line))
    }

    fn apply_decorations(
        &mut self,
        key: &FileKey,
        style: &DecorationStyle,
        decorations: Vec<Decoration>,
    ) {
        if decorations.is_empty() {
            self.overlays.remove(key);
            return;
        }
        self.overlays.insert(
            key.clone(),
            Overlay {
                style: style.clone(),
                decorations,
            },
        );
    }

    fn release_style(&mut self, style: StyleId) {
        self.overlays.retain(|_, overlay| overlay.style.id() != style);
    }

    fn prompt(&mut self, request: &PromptRequest) -> Option<String> {
        match &mut self.prompt {
            PromptSource::Answer(answer) => Some(answer.clone()),
            PromptSource::Reader(reader) => {
                let mut stderr = std::io::stderr();
                let hint = if request.value.is_empty() {
                    &request.placeholder
                } else {
                    &request.value
                };
                let _ = write!(stderr, "{} [{}]: ", request.prompt, hint);
                let _ = stderr.flush();

                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) => None,
                    Ok(_) => {
                        let input = line.trim_end_matches(['\n', '\r']);
                        // Enter on its own confirms the pre-filled value.
                        if input.is_empty() {
                            Some(request.value.clone())
                        } else {
                            Some(input.to_string())
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read input: {}", e);
                        None
                    }
                }
            }
        }
    }
}
