//! Tagged broadcast channel consumed by the replication loop

use serde::{Deserialize, Serialize};

/// Message payload; only text is replicated onto surfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

/// A message as delivered to a listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub tag: String,
    pub data: Payload,
}

/// Receiving end registered for a single tag
pub trait BroadcastListener {
    /// Whether a message is waiting; never blocks
    fn has_pending(&self) -> bool;

    /// Take the oldest pending message, if any; never blocks
    fn accept(&mut self) -> Option<BroadcastMessage>;
}

/// Many-to-many bus keyed by tag
///
/// Sending is fire-and-forget and must never block: every listener
/// registered for the tag gets its own copy, and a tag without listeners
/// drops the message.
pub trait BroadcastChannel {
    type Listener: BroadcastListener;

    fn register_listener(&self, tag: &str) -> Self::Listener;

    fn send(&self, tag: &str, payload: Payload);
}
