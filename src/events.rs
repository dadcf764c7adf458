//! # Live Events Module
//!
//! Publish/subscribe registry that notifies connected clients when items or
//! recipes change. Clients are keyed by their session ID: a client is added
//! when its connection opens and removed when it closes.
//!
//! Every message is a JSON object `{"type": ..., "data": ...}` delivered
//! together with its topic (`item` or `recipe`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::pantry_model::{ItemUpdate, NewItem, Recipe};

/// Channel a notification is published on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Item,
    Recipe,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Item => "item",
            Topic::Recipe => "recipe",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload of a `recipeDeleted` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDeleted {
    pub recipe_id: i32,
}

/// Change notifications sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum PantryEvent {
    ItemAdded(NewItem),
    ItemUpdated(ItemUpdate),
    ItemDeleted(i32),
    RecipeAdded(Recipe),
    RecipeUpdated(Recipe),
    RecipeDeleted(RecipeDeleted),
}

impl PantryEvent {
    /// Topic the event is published on
    pub fn topic(&self) -> Topic {
        match self {
            PantryEvent::ItemAdded(_) | PantryEvent::ItemUpdated(_) | PantryEvent::ItemDeleted(_) => {
                Topic::Item
            }
            PantryEvent::RecipeAdded(_)
            | PantryEvent::RecipeUpdated(_)
            | PantryEvent::RecipeDeleted(_) => Topic::Recipe,
        }
    }

    /// JSON message body
    pub fn to_message(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A message delivered to one client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMessage {
    pub topic: Topic,
    pub message: String,
}

/// Registry of connected clients keyed by session ID
///
/// Thread-safe; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, UnboundedSender<ClientMessage>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client and return the receiving end of its channel
    ///
    /// Registering an already known session ID replaces the previous
    /// connection, whose receiver stops getting messages.
    pub fn add_client(&self, session_id: &str) -> UnboundedReceiver<ClientMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        if clients.insert(session_id.to_string(), sender).is_some() {
            debug!(session_id, "Replaced existing client connection");
        }
        info!(session_id, clients = clients.len(), "Client connected");
        receiver
    }

    /// Unregister a client; returns false when the session ID was unknown
    pub fn remove_client(&self, session_id: &str) -> bool {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        let removed = clients.remove(session_id).is_some();
        info!(session_id, removed, "Removing client session");
        removed
    }

    /// Number of registered clients
    pub fn len(&self) -> usize {
        self.clients.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send a message to every registered client
    ///
    /// Clients whose receiver has been dropped are unregistered. Returns the
    /// number of clients the message was delivered to.
    pub fn message_clients(&self, topic: Topic, message: &str) -> usize {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        let mut delivered = 0;

        clients.retain(|session_id, sender| {
            let sent = sender.send(ClientMessage {
                topic,
                message: message.to_string(),
            });
            match sent {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    warn!(session_id = %session_id, "Dropping disconnected client");
                    false
                }
            }
        });

        debug!(topic = %topic, delivered, "Message sent to clients");
        delivered
    }

    /// Serialize an event and send it on its topic
    pub fn emit(&self, event: &PantryEvent) -> usize {
        match event.to_message() {
            Ok(message) => self.message_clients(event.topic(), &message),
            Err(e) => {
                warn!(error = %e, "Failed to serialize event");
                0
            }
        }
    }
}
