//! # Umbra - Shadow Comments
//!
//! Private, per-line notes shown as ghost text next to your code and never
//! written into the file.
//!
//! ## Quick Start
//!
//! ```bash
//! # Annotate line 12 of a file
//! umbra add src/main.rs 12 "why is this cloned?"
//!
//! # Show the file with its shadow comments
//! umbra show src/main.rs
//!
//! # Keep the view in sync while you edit
//! umbra watch src/main.rs
//! ```

mod terminal;
mod watch;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use umbra_core::config::default_state_path;
use umbra_core::{Command, Config, Document, ShadowComments};
use umbra_store::{AnnotationStore, FileKey, JsonFileBackend, LineNumber, PersistentStore};

use terminal::{PromptSource, TerminalHost};

/// Umbra - private shadow comments for any file
#[derive(Parser, Debug)]
#[command(name = "umbra")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Workspace the comments belong to
    #[arg(short, long, value_name = "DIR", global = true)]
    workspace: Option<PathBuf>,

    /// Use this state file instead of the workspace default
    #[arg(long, value_name = "FILE", global = true)]
    state_file: Option<PathBuf>,

    /// Use this config file instead of the default one
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Print ghost text without colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Add or edit the comment on a line
    Add {
        /// File to annotate
        file: PathBuf,
        /// Line number, starting at 1
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        line: u32,
        /// Comment text; prompts when omitted, empty deletes
        text: Option<String>,
    },
    /// Remove the comment on a line
    Remove {
        file: PathBuf,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        line: u32,
    },
    /// Print a file with its shadow comments
    Show {
        file: PathBuf,
        /// Render with shadow comments hidden
        #[arg(long)]
        hidden: bool,
    },
    /// List stored comments
    List {
        /// Only list comments of this file
        file: Option<PathBuf>,
    },
    /// List the commands a host editor can bind
    Commands,
    /// Redraw a file whenever it or the config changes
    Watch { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    tracing::debug!("Starting Umbra v{}", env!("CARGO_PKG_VERSION"));

    run(args)
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load(),
    };
    let color = !args.no_color && std::io::stdout().is_terminal();

    let store = open_store(&args)?;

    match args.command {
        Cmd::Add { file, line, text } => {
            let prompt = match text {
                Some(text) => PromptSource::Answer(text),
                None => PromptSource::Reader(Box::new(std::io::stdin().lock())),
            };
            let mut host = TerminalHost::new(prompt);
            let key = open_at(&mut host, &file, line)?;
            let mut ext = ShadowComments::activate(config, store, &mut host);

            ext.execute(Command::AddOrEditComment, &mut host)
                .with_context(|| format!("Failed to save comment on {}:{}", file.display(), line))?;
            report_line(ext.store(), &key, line);
        }
        Cmd::Remove { file, line } => {
            let mut host = TerminalHost::new(PromptSource::Answer(String::new()));
            let key = open_at(&mut host, &file, line)?;
            let mut ext = ShadowComments::activate(config, store, &mut host);

            ext.execute(Command::RemoveComment, &mut host)
                .with_context(|| format!("Failed to remove comment on {}:{}", file.display(), line))?;
            report_line(ext.store(), &key, line);
        }
        Cmd::Show { file, hidden } => {
            let mut host = TerminalHost::new(PromptSource::Answer(String::new()));
            let key = host.open(Document::from_file(&file)?);
            let mut ext = ShadowComments::activate(config, store, &mut host);
            if hidden {
                ext.execute(Command::ToggleVisibility, &mut host)?;
            }
            tracing::info!("{} shadow comments shown", host.decorations(&key).len());
            if let Some(out) = host.render_document(&key, color) {
                print!("{out}");
            }
        }
        Cmd::List { file } => {
            let files = match file {
                Some(file) => vec![FileKey::from_path(&file)?],
                None => store.files(),
            };
            for key in files {
                let lines = store.get(&key);
                if lines.is_empty() {
                    continue;
                }
                println!("{key}");
                for (line, text) in lines {
                    println!("  {}: {}", line.index() + 1, text);
                }
            }
        }
        Cmd::Commands => {
            for contribution in umbra_core::CommandRegistry::new().contributions() {
                println!("{}\t{}", contribution.id, contribution.title);
            }
        }
        Cmd::Watch { file } => {
            let mut host = TerminalHost::new(PromptSource::Answer(String::new()));
            let key = host.open(Document::from_file(&file)?);
            let mut ext = ShadowComments::activate(config, store, &mut host);

            let config_path = match args.config {
                Some(path) => Some(path),
                None => Config::default_path().ok(),
            };
            let targets = watch::WatchTargets {
                document: file,
                key,
                config: config_path,
                state: Some(ext.store().backend().path().to_path_buf()),
            };
            watch::run(&mut ext, &mut host, targets, color)?;
        }
    }

    Ok(())
}

/// Opens the workspace's annotation store.
fn open_store(args: &Args) -> anyhow::Result<PersistentStore<JsonFileBackend>> {
    let path = match &args.state_file {
        Some(path) => path.clone(),
        None => {
            let workspace = match &args.workspace {
                Some(dir) => dir.clone(),
                None => std::env::current_dir()?,
            };
            let workspace = std::fs::canonicalize(&workspace)
                .with_context(|| format!("Workspace not found: {}", workspace.display()))?;
            default_state_path(&workspace)?
        }
    };

    tracing::info!("Using state file {}", path.display());
    let backend = JsonFileBackend::open(&path)
        .with_context(|| format!("Failed to open state file {}", path.display()))?;
    Ok(PersistentStore::new(backend))
}

/// Opens `file` and puts the caret on the 1-based `line`.
fn open_at(host: &mut TerminalHost, file: &Path, line: u32) -> anyhow::Result<FileKey> {
    let document = Document::from_file(file)?;
    let line_count = document.line_count();
    if line as usize > line_count {
        bail!(
            "Line {} is past the end of {} ({} lines)",
            line,
            file.display(),
            line_count
        );
    }

    let key = host.open(document);
    host.set_caret(line as usize - 1);
    Ok(key)
}

fn report_line<S: AnnotationStore>(store: &S, key: &FileKey, line: u32) {
    match store.get(key).get(&LineNumber::new(line - 1)) {
        Some(text) => println!("{line}: // {text}"),
        None => println!("{line}: no comment"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["umbra", "show", "main.rs"]);
        assert!(matches!(args.command, Cmd::Show { hidden: false, .. }));
        assert!(!args.no_color);
    }

    #[test]
    fn test_args_add_with_text() {
        let args = Args::parse_from(["umbra", "add", "main.rs", "3", "look here"]);
        match args.command {
            Cmd::Add { file, line, text } => {
                assert_eq!(file, PathBuf::from("main.rs"));
                assert_eq!(line, 3);
                assert_eq!(text.as_deref(), Some("look here"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_args_reject_line_zero() {
        assert!(Args::try_parse_from(["umbra", "remove", "main.rs", "0"]).is_err());
        assert!(Args::try_parse_from(["umbra", "remove", "main.rs", "-2"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["umbra", "list", "--no-color", "-vv"]);
        assert!(args.no_color);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_add_show_remove_round_trip() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("main.rs");
        std::fs::write(&file, "fn main() {\n    run();\n}\n").unwrap();
        let state = dir.path().join("state.json");
        let state_arg = state.to_str().unwrap();
        let file_arg = file.to_str().unwrap();

        run(Args::parse_from([
            "umbra", "--state-file", state_arg, "add", file_arg, "2", "does this panic?",
        ]))
        .unwrap();

        let store = PersistentStore::new(JsonFileBackend::open(&state).unwrap());
        let key = FileKey::from_path(&file).unwrap();
        assert_eq!(store.get(&key)[&LineNumber::new(1)], "does this panic?");

        run(Args::parse_from([
            "umbra", "--state-file", state_arg, "remove", file_arg, "2",
        ]))
        .unwrap();

        let store = PersistentStore::new(JsonFileBackend::open(&state).unwrap());
        assert!(store.files().is_empty());
    }

    #[test]
    fn test_add_past_end_fails() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("short.txt");
        std::fs::write(&file, "one line").unwrap();
        let state = dir.path().join("state.json");

        let err = run(Args::parse_from([
            "umbra",
            "--state-file",
            state.to_str().unwrap(),
            "add",
            file.to_str().unwrap(),
            "5",
            "nope",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("past the end"));
        assert!(!state.exists());
    }
}
