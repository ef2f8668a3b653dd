//! Periodic replication cycle
//!
//! Each [`ReplicationLoop::tick`] runs a transmit phase followed by a receive
//! phase to completion. Transmitters publish their surface text only when its
//! content hash changed since the last publish. Receivers drain every pending
//! message and overwrite their surfaces with the text payload.
//!
//! Nothing that happens during a tick is fatal: unresolved surfaces, I/O
//! failures and unusable messages are logged and skipped, and the next tick
//! retries because surfaces are resolved again every cycle.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

use crate::channel::{BroadcastChannel, BroadcastListener, BroadcastMessage};
use crate::hash::{ContentHash, ContentHasher, Sha256Hasher};
use crate::surface::{SurfaceRef, SurfaceRegistry};
use crate::table::ReplicationTable;

/// Counters for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Transmitters that published
    pub sent: usize,
    /// Transmitters whose content hash did not change
    pub unchanged: usize,
    /// Transmitters that could not be resolved or read
    pub skipped: usize,
    /// Messages taken off listeners
    pub received: usize,
    /// Messages discarded (no receivers for the tag, or not text)
    pub dropped: usize,
    /// Successful surface writes
    pub written: usize,
    /// Receiver surfaces that could not be resolved or written
    pub write_failures: usize,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

impl std::ops::AddAssign for CycleReport {
    fn add_assign(&mut self, other: Self) {
        self.sent += other.sent;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.received += other.received;
        self.dropped += other.dropped;
        self.written += other.written;
        self.write_failures += other.write_failures;
    }
}

/// Drives replication for one table
///
/// Holds one listener per distinct receiver tag and the last published hash
/// of every transmitter.
pub struct ReplicationLoop<L> {
    table: ReplicationTable,
    listeners: Vec<(String, L)>,
    hashes: HashMap<(String, SurfaceRef), ContentHash>,
    hasher: Box<dyn ContentHasher + Send>,
}

impl<L: BroadcastListener> ReplicationLoop<L> {
    /// Register listeners for every receiver tag on `channel`
    pub fn new<C>(table: ReplicationTable, channel: &C) -> Self
    where
        C: BroadcastChannel<Listener = L>,
    {
        let listeners = table
            .subscriptions()
            .map(|tag| {
                debug!(tag = %tag, "Registering broadcast listener");
                (tag.to_string(), channel.register_listener(tag))
            })
            .collect();

        Self {
            table,
            listeners,
            hashes: HashMap::new(),
            hasher: Box::new(Sha256Hasher),
        }
    }

    /// Replace the content hasher
    pub fn with_hasher(mut self, hasher: impl ContentHasher + Send + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    pub fn table(&self) -> &ReplicationTable {
        &self.table
    }

    /// Last published hash for a transmitter, `None` until its first publish
    pub fn last_hash(&self, tag: &str) -> Option<&ContentHash> {
        let surface = self.table.transmitters().get(tag)?;
        self.hashes.get(&(tag.to_string(), surface.clone()))
    }

    /// Run one full transmit + receive cycle
    pub fn tick<C>(&mut self, registry: &dyn SurfaceRegistry, channel: &C) -> CycleReport
    where
        C: BroadcastChannel,
    {
        let mut report = CycleReport::default();
        self.transmit(registry, channel, &mut report);
        self.receive(registry, &mut report);
        report
    }

    fn transmit<C>(&mut self, registry: &dyn SurfaceRegistry, channel: &C, report: &mut CycleReport)
    where
        C: BroadcastChannel,
    {
        for (tag, surface_ref) in self.table.transmitters() {
            let surface = match registry.resolve_ref(surface_ref) {
                Ok(surface) => surface,
                Err(e) => {
                    warn!(tag = %tag, surface = %surface_ref, error = %e, "Transmitting surface unavailable");
                    report.skipped += 1;
                    continue;
                }
            };

            let text = match surface.read_text() {
                Ok(text) => text,
                Err(e) => {
                    warn!(tag = %tag, surface = %surface_ref, error = %e, "Failed to read surface");
                    report.skipped += 1;
                    continue;
                }
            };

            let hash = self.hasher.digest(&text);
            let key = (tag.clone(), surface_ref.clone());
            if self.hashes.get(&key) == Some(&hash) {
                trace!(tag = %tag, "Surface unchanged");
                report.unchanged += 1;
                continue;
            }

            debug!(tag = %tag, surface = %surface_ref, bytes = text.len(), "Transmitting surface");
            channel.send(tag, text.into());
            self.hashes.insert(key, hash);
            report.sent += 1;
        }
    }

    fn receive(&mut self, registry: &dyn SurfaceRegistry, report: &mut CycleReport) {
        for (listen_tag, listener) in &mut self.listeners {
            while listener.has_pending() {
                let Some(message) = listener.accept() else {
                    break;
                };
                report.received += 1;
                trace!(listener = %listen_tag, tag = %message.tag, "Accepted message");
                deliver(&self.table, registry, &message, report);
            }
        }
    }
}

fn deliver(
    table: &ReplicationTable,
    registry: &dyn SurfaceRegistry,
    message: &BroadcastMessage,
    report: &mut CycleReport,
) {
    let targets = table.receivers_for(&message.tag);
    if targets.is_empty() {
        debug!(tag = %message.tag, "No receivers for tag, dropping message");
        report.dropped += 1;
        return;
    }

    let Some(text) = message.data.as_text() else {
        trace!(tag = %message.tag, "Dropping non-text payload");
        report.dropped += 1;
        return;
    };

    for surface_ref in targets {
        let surface = match registry.resolve_ref(surface_ref) {
            Ok(surface) => surface,
            Err(e) => {
                warn!(tag = %message.tag, surface = %surface_ref, error = %e, "Receiving surface unavailable");
                report.write_failures += 1;
                continue;
            }
        };

        match surface.write_text(text, false) {
            Ok(()) => {
                debug!(tag = %message.tag, surface = %surface_ref, "Updated receiving surface");
                report.written += 1;
            }
            Err(e) => {
                warn!(tag = %message.tag, surface = %surface_ref, error = %e, "Failed to write surface");
                report.write_failures += 1;
            }
        }
    }
}
