//! In-process broadcast bus
//!
//! Every listener owns an unbounded queue, so sending never blocks and a
//! slow listener never loses messages. Queues whose listener was dropped are
//! pruned on the next send to their tag.

use panelcast_core::{BroadcastChannel, BroadcastListener, BroadcastMessage, Payload};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

type Subscribers = HashMap<String, Vec<UnboundedSender<BroadcastMessage>>>;

/// Shared many-to-many bus; clones refer to the same bus
#[derive(Debug, Clone, Default)]
pub struct LocalBus {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live listeners registered for `tag`
    pub fn listener_count(&self, tag: &str) -> usize {
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers
            .get(tag)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl BroadcastChannel for LocalBus {
    type Listener = LocalListener;

    fn register_listener(&self, tag: &str) -> LocalListener {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.entry(tag.to_string()).or_default().push(tx);
        LocalListener { rx, peeked: None }
    }

    fn send(&self, tag: &str, payload: Payload) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        let Some(senders) = subscribers.get_mut(tag) else {
            trace!(tag = %tag, "No listeners for tag");
            return;
        };

        let message = BroadcastMessage {
            tag: tag.to_string(),
            data: payload,
        };
        senders.retain(|tx| tx.send(message.clone()).is_ok());
        trace!(tag = %tag, listeners = senders.len(), "Broadcast message");
    }
}

/// Non-blocking receiving end for one tag
#[derive(Debug)]
pub struct LocalListener {
    rx: UnboundedReceiver<BroadcastMessage>,
    peeked: Option<BroadcastMessage>,
}

impl LocalListener {
    fn fill(&mut self) {
        if self.peeked.is_none() {
            self.peeked = self.rx.try_recv().ok();
        }
    }
}

impl BroadcastListener for LocalListener {
    fn has_pending(&self) -> bool {
        self.peeked.is_some() || !self.rx.is_empty()
    }

    fn accept(&mut self) -> Option<BroadcastMessage> {
        self.fill();
        self.peeked.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_to_all_listeners() {
        let bus = LocalBus::new();
        let mut a = bus.register_listener("hud");
        let mut b = bus.register_listener("hud");
        let mut other = bus.register_listener("cargo");

        bus.send("hud", "Speed: 98 m/s".into());

        assert!(a.has_pending());
        assert_eq!(a.accept().unwrap().data, Payload::Text("Speed: 98 m/s".to_string()));
        assert!(!a.has_pending());
        assert_eq!(b.accept().unwrap().tag, "hud");
        assert!(!other.has_pending());
        assert!(other.accept().is_none());
    }

    #[test]
    fn test_arrival_order_preserved() {
        let bus = LocalBus::new();
        let mut listener = bus.register_listener("hud");
        for i in 0..5 {
            bus.send("hud", Payload::Text(i.to_string()));
        }

        let mut received = Vec::new();
        while listener.has_pending() {
            if let Some(message) = listener.accept() {
                received.push(message.data);
            }
        }
        let expected: Vec<_> = (0..5).map(|i| Payload::Text(i.to_string())).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn test_send_without_listeners() {
        let bus = LocalBus::new();
        bus.send("nobody", "hello".into());
        assert_eq!(bus.listener_count("nobody"), 0);
    }

    #[test]
    fn test_dropped_listener_pruned() {
        let bus = LocalBus::new();
        let listener = bus.register_listener("hud");
        let _kept = bus.register_listener("hud");
        assert_eq!(bus.listener_count("hud"), 2);

        drop(listener);
        bus.send("hud", "ping".into());
        assert_eq!(bus.listener_count("hud"), 1);
    }
}
