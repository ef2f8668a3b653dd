//! Panelcast Core - Configuration parsing and tag-based panel replication
//!
//! This crate provides the replication engine that mirrors text-panel
//! content between displays over a tagged broadcast channel:
//! - Parsing of the nested `key=value` replication configuration
//! - Replication table mapping tags to transmitting and receiving surfaces
//! - The periodic transmit/receive cycle with content-hash change suppression
//!
//! The host supplies the surface registry and the broadcast channel through
//! the [`SurfaceRegistry`] and [`BroadcastChannel`] traits.

pub mod channel;
pub mod config;
pub mod hash;
pub mod replicate;
pub mod surface;
pub mod table;

#[cfg(test)]
mod testing;

pub use channel::{BroadcastChannel, BroadcastListener, BroadcastMessage, Payload};
pub use config::{ConfigError, ConfigSection};
pub use hash::{sha256_hex, ContentHash, ContentHasher, Sha256Hasher};
pub use replicate::{CycleReport, ReplicationLoop};
pub use surface::{check_index, ResolveError, SurfaceError, SurfaceRef, SurfaceRegistry, TextSurface};
pub use table::ReplicationTable;
