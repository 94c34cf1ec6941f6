//! Commands contributed to the host.
//!
//! ## Learning: The Command Pattern
//!
//! Commands are plain values. Hosts register them under stable string ids,
//! then hand the resolved [`Command`] to
//! [`ShadowComments::execute`](crate::ShadowComments::execute).

use std::collections::HashMap;

use crate::{CoreError, CoreResult};

/// Prompt shown when adding or editing a comment.
pub const ADD_PROMPT: &str = "Type your shadow comment (private to you)";

/// Placeholder shown while the prompt is empty.
pub const ADD_PLACEHOLDER: &str = "e.g., TODO: Check this logic";

/// Shadow comment commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Prompt for the comment on the caret line, pre-filled with the current one
    AddOrEditComment,
    /// Delete the comment on the caret line
    RemoveComment,
    /// Show or hide all ghost text
    ToggleVisibility,
}

impl Command {
    /// Every command, in contribution order.
    pub const ALL: [Command; 3] = [
        Command::AddOrEditComment,
        Command::RemoveComment,
        Command::ToggleVisibility,
    ];

    /// Returns the id the host registers the command under.
    pub fn id(&self) -> &'static str {
        match self {
            Command::AddOrEditComment => "shadow-comments.addComment",
            Command::RemoveComment => "shadow-comments.removeComment",
            Command::ToggleVisibility => "shadow-comments.toggleVisibility",
        }
    }

    /// Returns the command's display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Command::AddOrEditComment => "Add/Edit Shadow Comment",
            Command::RemoveComment => "Remove Shadow Comment",
            Command::ToggleVisibility => "Toggle Shadow Comments",
        }
    }
}

/// A command as listed in a host's command palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContribution {
    /// Command identifier
    pub id: &'static str,
    /// Display name
    pub title: &'static str,
}

/// Maps command ids to commands.
pub struct CommandRegistry {
    commands: HashMap<&'static str, Command>,
}

impl CommandRegistry {
    /// Creates a registry holding every shadow comment command.
    pub fn new() -> Self {
        let commands = Command::ALL.iter().map(|cmd| (cmd.id(), *cmd)).collect();
        Self { commands }
    }

    /// Looks up a command by id.
    pub fn resolve(&self, id: &str) -> CoreResult<Command> {
        self.commands
            .get(id)
            .copied()
            .ok_or_else(|| CoreError::CommandNotFound(id.to_string()))
    }

    /// Returns what the host should register, in contribution order.
    pub fn contributions(&self) -> Vec<CommandContribution> {
        Command::ALL
            .iter()
            .filter(|cmd| self.commands.contains_key(cmd.id()))
            .map(|cmd| CommandContribution {
                id: cmd.id(),
                title: cmd.display_name(),
            })
            .collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
