//! Wiring of store, renderer, commands and events.
//!
//! ## Learning: The Facade Pattern
//!
//! `ShadowComments` is the one object a host holds. It is constructed once at
//! startup and every command or event goes through it, so the visibility
//! flag and style live in exactly one place.

use umbra_store::{AnnotationStore, LineNumber};

use crate::command::{ADD_PLACEHOLDER, ADD_PROMPT, Command, CommandRegistry};
use crate::config::{COLOR_OPTION, Config};
use crate::event::{EventHandler, HostEvent};
use crate::host::{EditorView, HostPort, PromptRequest};
use crate::overlay::{DecorationStyle, OverlayRenderer};
use crate::CoreResult;

/// Shadow comments attached to a host.
pub struct ShadowComments<S> {
    store: S,
    renderer: OverlayRenderer,
    config: Config,
    commands: CommandRegistry,
}

impl<S: AnnotationStore> ShadowComments<S> {
    /// Builds the style from `config` and draws the active editor, if any.
    pub fn activate<H: HostPort + ?Sized>(config: Config, store: S, host: &mut H) -> Self {
        tracing::info!("Shadow comments active");

        let this = Self {
            renderer: OverlayRenderer::new(&config),
            store,
            config,
            commands: CommandRegistry::new(),
        };
        this.refresh_active(host);
        this
    }

    /// Returns the annotation store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the renderer.
    pub fn renderer(&self) -> &OverlayRenderer {
        &self.renderer
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs a command against the active editor.
    ///
    /// Without an active editor every command is a no-op.
    pub fn execute<H: HostPort + ?Sized>(
        &mut self,
        command: Command,
        host: &mut H,
    ) -> CoreResult<()> {
        tracing::debug!("Executing {}", command.id());
        match command {
            Command::AddOrEditComment => self.add_or_edit(host),
            Command::RemoveComment => self.remove(host),
            Command::ToggleVisibility => {
                self.renderer.toggle_visibility();
                self.refresh_active(host);
                Ok(())
            }
        }
    }

    /// Runs the command registered under `id`.
    pub fn execute_id<H: HostPort + ?Sized>(&mut self, id: &str, host: &mut H) -> CoreResult<()> {
        let command = self.commands.resolve(id)?;
        self.execute(command, host)
    }

    fn add_or_edit<H: HostPort + ?Sized>(&mut self, host: &mut H) -> CoreResult<()> {
        let Some(view) = host.active_editor() else {
            return Ok(());
        };
        let line = LineNumber::try_from(view.caret_line)?;
        let existing = self.store.get(&view.key).remove(&line).unwrap_or_default();

        let request = PromptRequest {
            prompt: ADD_PROMPT.to_string(),
            placeholder: ADD_PLACEHOLDER.to_string(),
            value: existing,
        };
        let Some(input) = host.prompt(&request) else {
            tracing::debug!("Prompt cancelled, nothing changed");
            return Ok(());
        };

        self.store.set(&view.key, line, &input)?;
        self.render_current(view, host);
        Ok(())
    }

    fn remove<H: HostPort + ?Sized>(&mut self, host: &mut H) -> CoreResult<()> {
        let Some(view) = host.active_editor() else {
            return Ok(());
        };
        let line = LineNumber::try_from(view.caret_line)?;

        self.store.set(&view.key, line, "")?;
        self.render_current(view, host);
        Ok(())
    }

    /// Renders `view`, preferring a fresher snapshot of the same document.
    fn render_current<H: HostPort + ?Sized>(&self, view: EditorView, host: &mut H) {
        let view = host
            .active_editor()
            .filter(|current| current.key == view.key)
            .unwrap_or(view);
        self.renderer.render(&self.store, &view, host);
    }

    /// Re-renders the active editor. Returns the number of decorations shown.
    pub fn refresh_active<H: HostPort + ?Sized>(&self, host: &mut H) -> usize {
        match host.active_editor() {
            Some(view) => self.renderer.render(&self.store, &view, host),
            None => 0,
        }
    }

    /// Reacts to one host event.
    pub fn handle_event<H: HostPort + ?Sized>(&mut self, event: HostEvent, host: &mut H) {
        match event {
            HostEvent::ActiveEditorChanged(Some(key)) => {
                if let Some(view) = host.active_editor().filter(|view| view.key == key) {
                    self.renderer.render(&self.store, &view, host);
                }
            }
            HostEvent::ActiveEditorChanged(None) => {}
            HostEvent::DocumentChanged(key) => {
                if let Some(view) = host.active_editor().filter(|view| view.key == key) {
                    self.renderer.render(&self.store, &view, host);
                }
            }
            HostEvent::ConfigurationChanged(config) => {
                let restyle = config.affects(&self.config, COLOR_OPTION);
                self.config = config;
                if restyle {
                    tracing::info!("Color changed to {}", self.config.color);
                    let style = DecorationStyle::from_config(&self.config);
                    self.renderer.set_style(style, host);
                    self.refresh_active(host);
                }
            }
        }
    }

    /// Handles every queued event, one at a time. Returns how many there were.
    pub fn drain<H: HostPort + ?Sized>(&mut self, events: &mut EventHandler, host: &mut H) -> usize {
        let mut handled = 0;
        while let Some(event) = events.try_next() {
            self.handle_event(event, host);
            handled += 1;
        }
        handled
    }
}
