//! `umbra watch`: keep a document's ghost text in sync with edits.
//!
//! ## Learning: Bridging Threads into an Event Loop
//!
//! `notify` calls back on its own thread. The callback only turns file system
//! events into [`HostEvent`]s on the bus; all state changes happen on the
//! single task that drains the bus, one event at a time.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use notify::{Event, RecursiveMode, Watcher};
use umbra_core::{Config, EventBus, EventHandler, HostEvent, ShadowComments};
use umbra_store::{AnnotationStore, FileKey};

use crate::terminal::TerminalHost;

/// Files whose changes feed the bus.
pub struct WatchTargets {
    /// The document being shown
    pub document: PathBuf,
    /// Its identity
    pub key: FileKey,
    /// Config file to reload on change, if any
    pub config: Option<PathBuf>,
    /// State file other `umbra` processes write comments to, if any
    pub state: Option<PathBuf>,
}

/// What a changed path means for the shown document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Document,
    Config,
    State,
}

/// Canonical forms of the watched files, as the watcher reports them.
#[derive(Debug, Clone)]
struct WatchPaths {
    document: PathBuf,
    config: Option<PathBuf>,
    state: Option<PathBuf>,
}

impl WatchPaths {
    fn new(targets: &WatchTargets) -> Self {
        Self {
            document: canonical(&targets.document),
            config: targets.config.as_deref().map(canonical),
            state: targets.state.as_deref().map(canonical),
        }
    }

    fn classify(&self, path: &Path) -> Option<Change> {
        if path == self.document {
            Some(Change::Document)
        } else if Some(path) == self.config.as_deref() {
            Some(Change::Config)
        } else if Some(path) == self.state.as_deref() {
            Some(Change::State)
        } else {
            None
        }
    }

    /// Parent directories to watch, each once.
    ///
    /// Editors often save by renaming a new file over the old one, which a
    /// watch on the file itself would miss.
    fn dirs(&self) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = Vec::new();
        let files = std::iter::once(&self.document)
            .chain(self.config.as_ref())
            .chain(self.state.as_ref());
        for dir in files.filter_map(|file| file.parent()) {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }
}

/// Redraws `targets.document` until Ctrl-C.
pub fn run<S: AnnotationStore>(
    ext: &mut ShadowComments<S>,
    host: &mut TerminalHost,
    targets: WatchTargets,
    color: bool,
) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start event loop")?;

    runtime.block_on(watch(ext, host, targets, color))
}

async fn watch<S: AnnotationStore>(
    ext: &mut ShadowComments<S>,
    host: &mut TerminalHost,
    targets: WatchTargets,
    color: bool,
) -> anyhow::Result<()> {
    let bus = EventBus::new();
    let mut events = EventHandler::new(bus.subscribe());

    if let Some(parent) = targets.state.as_deref().and_then(Path::parent) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let paths = WatchPaths::new(&targets);

    let mut watcher = {
        let bus = bus.clone();
        let key = targets.key.clone();
        let paths = paths.clone();
        notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => event,
                Ok(_) => return,
                Err(e) => {
                    tracing::warn!("Watch error: {}", e);
                    return;
                }
            };
            for path in &event.paths {
                match paths.classify(path) {
                    // Comments are read from the store on every render, so a
                    // state change only needs the document redrawn.
                    Some(Change::Document | Change::State) => {
                        bus.emit(HostEvent::DocumentChanged(key.clone()));
                    }
                    Some(Change::Config) => match Config::load_from(path) {
                        Ok(config) => bus.emit(HostEvent::ConfigurationChanged(config)),
                        Err(e) => tracing::warn!("Ignoring config change: {}", e),
                    },
                    None => {}
                }
            }
        })?
    };

    for dir in paths.dirs() {
        if !dir.is_dir() {
            tracing::debug!("Not watching missing directory {}", dir.display());
            continue;
        }
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
    }

    redraw(host, &targets.key, color)?;
    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                if let HostEvent::DocumentChanged(key) = &event {
                    if let Some(document) = host.document_mut(key) {
                        if let Err(e) = document.reload() {
                            tracing::warn!("Failed to reload {}: {}", key, e);
                            continue;
                        }
                    }
                }
                ext.handle_event(event, host);
                redraw(host, &targets.key, color)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

fn redraw(host: &TerminalHost, key: &FileKey, color: bool) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
    if let Some(out) = host.render_document(key, color) {
        stdout.write_all(out.as_bytes())?;
    }
    stdout.flush()?;
    Ok(())
}

/// Canonical form used to compare against watcher paths.
///
/// A file that does not exist yet is resolved through its parent.
fn canonical(path: &Path) -> PathBuf {
    if let Ok(path) = std::fs::canonicalize(path) {
        return path;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => std::fs::canonicalize(parent)
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}
