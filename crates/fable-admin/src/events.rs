//! Change events and the subscriber registry.
//!
//! The registry is an owned value handed to whoever needs it (the gateway
//! publishes, the server subscribes). Each subscriber holds the receiving end
//! of an unbounded channel; subscribers whose receiver has been dropped are
//! pruned on the next broadcast.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

// ---------------------------------------------------------------------------
// StoryEvent
// ---------------------------------------------------------------------------

/// A completed authoring change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StoryEvent {
    CharacterCreated { character: String },
    ManifestUpdated { character: String },
    SceneCreated { character: String, file_path: String },
    SceneUpdated { character: String, file_path: String },
    SceneDeleted { character: String, file_path: String },
    NamesNormalized { character: String, renamed: usize },
}

impl StoryEvent {
    /// The character the change applies to.
    pub fn character(&self) -> &str {
        match self {
            StoryEvent::CharacterCreated { character }
            | StoryEvent::ManifestUpdated { character }
            | StoryEvent::SceneCreated { character, .. }
            | StoryEvent::SceneUpdated { character, .. }
            | StoryEvent::SceneDeleted { character, .. }
            | StoryEvent::NamesNormalized { character, .. } => character,
        }
    }

    /// Event name, used as the SSE `event:` field.
    pub fn name(&self) -> &'static str {
        match self {
            StoryEvent::CharacterCreated { .. } => "characterCreated",
            StoryEvent::ManifestUpdated { .. } => "manifestUpdated",
            StoryEvent::SceneCreated { .. } => "sceneCreated",
            StoryEvent::SceneUpdated { .. } => "sceneUpdated",
            StoryEvent::SceneDeleted { .. } => "sceneDeleted",
            StoryEvent::NamesNormalized { .. } => "namesNormalized",
        }
    }
}

// ---------------------------------------------------------------------------
// ClientRegistry
// ---------------------------------------------------------------------------

/// Handle identifying one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

/// Connected change-event subscribers.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    next_id: AtomicU64,
    clients: Mutex<BTreeMap<ClientId, UnboundedSender<StoryEvent>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn clients(&self) -> MutexGuard<'_, BTreeMap<ClientId, UnboundedSender<StoryEvent>>> {
        // The map stays consistent even if a holder panicked.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a subscriber and return its id and event receiver.
    pub fn add(&self) -> (ClientId, UnboundedReceiver<StoryEvent>) {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients().insert(id, tx);
        tracing::debug!(client = id.0, "event subscriber added");
        (id, rx)
    }

    /// Unregister a subscriber. Returns `false` if it was already gone.
    pub fn remove(&self, id: ClientId) -> bool {
        let removed = self.clients().remove(&id).is_some();
        if removed {
            tracing::debug!(client = id.0, "event subscriber removed");
        }
        removed
    }

    /// Send `event` to every subscriber and return how many received it.
    pub fn broadcast(&self, event: &StoryEvent) -> usize {
        let mut clients = self.clients();
        clients.retain(|_, tx| tx.send(event.clone()).is_ok());
        clients.len()
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
