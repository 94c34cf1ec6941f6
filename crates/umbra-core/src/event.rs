//! Host events that trigger a re-render.
//!
//! ## Learning: Observer Pattern in Rust
//!
//! Events are values sent over a `tokio::sync::broadcast` channel. The host
//! side emits them (possibly from a watcher thread), and a single consumer
//! hands them one at a time to
//! [`ShadowComments::handle_event`](crate::ShadowComments::handle_event).

use tokio::sync::broadcast;
use umbra_store::FileKey;

use crate::config::Config;

/// Events a host delivers.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// Focus moved to another editor, or away from all editors
    ActiveEditorChanged(Option<FileKey>),
    /// A document's text changed
    DocumentChanged(FileKey),
    /// Configuration was reloaded; carries the new values
    ConfigurationChanged(Config),
}

/// Event bus for broadcasting host events.
pub struct EventBus {
    sender: broadcast::Sender<HostEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: HostEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Receiving end of the bus.
pub struct EventHandler {
    receiver: broadcast::Receiver<HostEvent>,
}

impl EventHandler {
    /// Creates a new event handler.
    pub fn new(receiver: broadcast::Receiver<HostEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event. Returns `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<HostEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next queued event without waiting.
    pub fn try_next(&mut self) -> Option<HostEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}
