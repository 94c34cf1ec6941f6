//! Ghost text overlay.
//!
//! The overlay is recomputed from scratch on every render: the store is read,
//! lines past the end of the document are skipped, and the full decoration
//! list replaces whatever the host showed before. There is no diffing, so the
//! result depends only on the store, the document length, the style and the
//! visibility flag.

use umbra_store::{AnnotationStore, FileKey, LineMap};

use crate::config::{Config, DEFAULT_COLOR};
use crate::host::{EditorView, HostPort};

/// Comment marker placed before the stored text.
pub const MARKER: &str = "//";

/// Left margin between the code and the ghost text, in `em`.
pub const MARGIN_EM: u16 = 2;

/// Identifies one installed style so the host can release it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleId(u64);

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parses `#rgb` or `#rrggbb`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();

        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..=i].repeat(2));
                Some(Self {
                    r: expand(0)?,
                    g: expand(1)?,
                    b: expand(2)?,
                })
            }
            6 => Some(Self {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            _ => None,
        }
    }
}

/// Look of every shadow comment, shared by all documents.
///
/// Ghost text is always italic. Decorations are closed on both ends: typing
/// at the anchor does not widen them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationStyle {
    id: StyleId,

    /// Text color
    pub color: Rgb,

    /// Left margin in `em`
    pub margin_em: u16,
}

impl DecorationStyle {
    /// Builds the style described by `config`.
    ///
    /// An unparsable color falls back to the default gray.
    pub fn from_config(config: &Config) -> Self {
        let color = Rgb::parse_hex(&config.color).unwrap_or_else(|| {
            tracing::warn!(
                "Invalid color {:?}, using {}",
                config.color,
                DEFAULT_COLOR
            );
            default_color()
        });

        Self {
            id: StyleId(0),
            color,
            margin_em: MARGIN_EM,
        }
    }

    /// Returns the id assigned when the style was installed.
    pub fn id(&self) -> StyleId {
        self.id
    }
}

fn default_color() -> Rgb {
    Rgb {
        r: 0x7f,
        g: 0x84,
        b: 0x87,
    }
}

/// Ghost text anchored at column 0 of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    /// Zero-based line
    pub line: usize,

    /// Text as it should appear, marker included
    pub text: String,
}

impl Decoration {
    /// Composes the visible text for a stored comment.
    pub fn new(line: usize, comment: &str) -> Self {
        Self {
            line,
            text: format!("  {MARKER} {comment}"),
        }
    }
}

/// Whether ghost text is drawn at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    pub fn toggled(self) -> Self {
        match self {
            Visibility::Visible => Visibility::Hidden,
            Visibility::Hidden => Visibility::Visible,
        }
    }
}

/// Computes and applies decorations.
///
/// Owns the process-wide style and visibility flag, so independent renderers
/// never share state.
#[derive(Debug)]
pub struct OverlayRenderer {
    style: DecorationStyle,
    visibility: Visibility,
    next_style_id: u64,
}

impl OverlayRenderer {
    /// Creates a visible renderer with the style from `config`.
    pub fn new(config: &Config) -> Self {
        let mut style = DecorationStyle::from_config(config);
        style.id = StyleId(1);
        Self {
            style,
            visibility: Visibility::Visible,
            next_style_id: 2,
        }
    }

    /// Returns the active style.
    pub fn style(&self) -> &DecorationStyle {
        &self.style
    }

    /// Returns the visibility flag.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Flips the visibility flag and returns the new value.
    pub fn toggle_visibility(&mut self) -> Visibility {
        self.visibility = self.visibility.toggled();
        tracing::debug!("Shadow comments are now {:?}", self.visibility);
        self.visibility
    }

    /// Installs `style`, releasing the one it replaces.
    pub fn set_style<H: HostPort + ?Sized>(&mut self, mut style: DecorationStyle, host: &mut H) {
        style.id = StyleId(self.next_style_id);
        self.next_style_id += 1;

        let previous = std::mem::replace(&mut self.style, style);
        host.release_style(previous.id);
        tracing::debug!("Replaced style {:?} with {:?}", previous.id, self.style.id);
    }

    /// Builds the decorations for `lines` on a document of `line_count` lines.
    ///
    /// Lines at or past `line_count` are skipped; they stay in the store and
    /// show up again once the document is long enough.
    pub fn decorations(lines: &LineMap, line_count: usize) -> Vec<Decoration> {
        lines
            .iter()
            .filter(|(line, _)| line.index() < line_count)
            .map(|(line, text)| Decoration::new(line.index(), text))
            .collect()
    }

    /// Recomputes the overlay of the document in `view` and hands it to the
    /// host in one call. Returns the number of decorations applied.
    pub fn render<S, H>(&self, store: &S, view: &EditorView, host: &mut H) -> usize
    where
        S: AnnotationStore + ?Sized,
        H: HostPort + ?Sized,
    {
        if self.visibility == Visibility::Hidden {
            self.clear(&view.key, host);
            return 0;
        }

        let lines = store.get(&view.key);
        if lines.is_empty() {
            self.clear(&view.key, host);
            return 0;
        }

        let decorations = Self::decorations(&lines, view.line_count);
        let count = decorations.len();
        tracing::debug!(
            "Rendering {} of {} comments on {}",
            count,
            lines.len(),
            view.key
        );
        host.apply_decorations(&view.key, &self.style, decorations);
        count
    }

    fn clear<H: HostPort + ?Sized>(&self, key: &FileKey, host: &mut H) {
        host.apply_decorations(key, &self.style, Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::FakeHost;
    use umbra_store::{LineNumber, PersistentStore};

    fn key(name: &str) -> FileKey {
        FileKey::from_uri(format!("file:///project/{name}"))
    }

    fn view(name: &str, line_count: usize) -> EditorView {
        EditorView {
            key: key(name),
            line_count,
            caret_line: 0,
        }
    }

    fn store_with(entries: &[(&str, u32, &str)]) -> PersistentStore<umbra_store::MemoryBackend> {
        let mut store = PersistentStore::in_memory();
        for (file, line, text) in entries {
            store.set(&key(file), LineNumber::new(*line), text).unwrap();
        }
        store
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(
            Rgb::parse_hex("#7f8487"),
            Some(Rgb {
                r: 0x7f,
                g: 0x84,
                b: 0x87
            })
        );
        assert_eq!(
            Rgb::parse_hex("#fa0"),
            Some(Rgb {
                r: 0xff,
                g: 0xaa,
                b: 0x00
            })
        );
        assert_eq!(Rgb::parse_hex("7f8487"), None);
        assert_eq!(Rgb::parse_hex("#12345"), None);
        assert_eq!(Rgb::parse_hex("#gggggg"), None);
        assert_eq!(Rgb::parse_hex("#ééé"), None);
    }

    #[test]
    fn test_style_from_config() {
        let style = DecorationStyle::from_config(&Config::default());
        assert_eq!(style.color, default_color());
        assert_eq!(style.margin_em, 2);

        let bad = Config {
            color: "chartreuse".to_string(),
        };
        assert_eq!(DecorationStyle::from_config(&bad).color, default_color());
    }

    #[test]
    fn test_decoration_text() {
        let decoration = Decoration::new(5, "check null");
        assert_eq!(decoration.line, 5);
        assert_eq!(decoration.text, "  // check null");
    }

    #[test]
    fn test_render_applies_once() {
        let store = store_with(&[("a.rs", 1, "one"), ("a.rs", 3, "three")]);
        let renderer = OverlayRenderer::new(&Config::default());
        let mut host = FakeHost::default();

        let count = renderer.render(&store, &view("a.rs", 10), &mut host);

        assert_eq!(count, 2);
        assert_eq!(host.apply_calls, 1);
        assert_eq!(
            host.shown(&key("a.rs")),
            vec![Decoration::new(1, "one"), Decoration::new(3, "three")]
        );
    }

    #[test]
    fn test_render_is_idempotent() {
        let store = store_with(&[("a.rs", 0, "x"), ("a.rs", 2, "y")]);
        let renderer = OverlayRenderer::new(&Config::default());
        let mut host = FakeHost::default();

        renderer.render(&store, &view("a.rs", 3), &mut host);
        let first = host.shown(&key("a.rs"));
        renderer.render(&store, &view("a.rs", 3), &mut host);

        assert_eq!(host.shown(&key("a.rs")), first);
    }

    #[test]
    fn test_out_of_range_lines_are_skipped_not_deleted() {
        let store = store_with(&[("a.rs", 1, "in"), ("a.rs", 5, "out")]);
        let renderer = OverlayRenderer::new(&Config::default());
        let mut host = FakeHost::default();

        renderer.render(&store, &view("a.rs", 5), &mut host);
        assert_eq!(host.shown(&key("a.rs")), vec![Decoration::new(1, "in")]);
        assert_eq!(store.get(&key("a.rs")).len(), 2);

        // The document grows past line 5.
        renderer.render(&store, &view("a.rs", 6), &mut host);
        assert_eq!(host.shown(&key("a.rs")).len(), 2);
    }

    #[test]
    fn test_empty_store_clears() {
        let store = PersistentStore::in_memory();
        let renderer = OverlayRenderer::new(&Config::default());
        let mut host = FakeHost::default();
        host.overlays.insert(
            key("a.rs"),
            (renderer.style().id(), vec![Decoration::new(0, "stale")]),
        );

        assert_eq!(renderer.render(&store, &view("a.rs", 4), &mut host), 0);
        assert!(host.shown(&key("a.rs")).is_empty());
    }

    #[test]
    fn test_hidden_renders_nothing() {
        let store = store_with(&[("a.rs", 0, "x")]);
        let mut renderer = OverlayRenderer::new(&Config::default());
        let mut host = FakeHost::default();

        renderer.render(&store, &view("a.rs", 1), &mut host);
        let visible = host.shown(&key("a.rs"));

        assert_eq!(renderer.toggle_visibility(), Visibility::Hidden);
        renderer.render(&store, &view("a.rs", 1), &mut host);
        assert!(host.shown(&key("a.rs")).is_empty());
        assert_eq!(store.get(&key("a.rs")).len(), 1);

        assert_eq!(renderer.toggle_visibility(), Visibility::Visible);
        renderer.render(&store, &view("a.rs", 1), &mut host);
        assert_eq!(host.shown(&key("a.rs")), visible);
    }

    #[test]
    fn test_set_style_releases_previous() {
        let mut renderer = OverlayRenderer::new(&Config::default());
        let mut host = FakeHost::default();
        let store = store_with(&[("a.rs", 0, "x")]);

        for color in ["#111111", "#222222", "#333333"] {
            let config = Config {
                color: color.to_string(),
            };
            renderer.set_style(DecorationStyle::from_config(&config), &mut host);
            renderer.render(&store, &view("a.rs", 1), &mut host);
        }

        assert_eq!(host.released.len(), 3);
        assert_eq!(host.live_styles.len(), 1);
        assert!(host.live_styles.contains(&renderer.style().id()));
        assert_eq!(
            renderer.style().color,
            Rgb {
                r: 0x33,
                g: 0x33,
                b: 0x33
            }
        );
    }

    #[test]
    fn test_independent_renderers() {
        let mut a = OverlayRenderer::new(&Config::default());
        let b = OverlayRenderer::new(&Config::default());

        a.toggle_visibility();
        assert_eq!(a.visibility(), Visibility::Hidden);
        assert_eq!(b.visibility(), Visibility::Visible);
    }
}
