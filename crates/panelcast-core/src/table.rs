//! Replication table built from the parsed configuration
//!
//! `[transmitter]` sections map a tag to exactly one source surface (the last
//! section for a tag wins). `[receiver]` sections append a destination
//! surface to the tag's list. Any other section name is ignored.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::{ConfigError, ConfigSection};
use crate::surface::{SurfaceRef, SurfaceRegistry};

pub const TRANSMITTER_SECTION: &str = "transmitter";
pub const RECEIVER_SECTION: &str = "receiver";

/// Tag to surface mapping, fixed after startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplicationTable {
    transmitters: BTreeMap<String, SurfaceRef>,
    receivers: BTreeMap<String, Vec<SurfaceRef>>,
}

/// One `[transmitter]` or `[receiver]` section after validation
struct Endpoint {
    tag: String,
    surface: SurfaceRef,
}

impl ReplicationTable {
    /// Build the table from the root section
    ///
    /// Sections with a missing `block` or a surface that does not resolve
    /// are skipped with a warning. A non-integer `surface` is fatal.
    pub fn build(root: &ConfigSection, registry: &dyn SurfaceRegistry) -> Result<Self, ConfigError> {
        let mut table = Self::default();

        for section in root.sections() {
            debug!(section = %section.name(), "Reading section");
            match section.name() {
                TRANSMITTER_SECTION => {
                    if let Some(endpoint) = read_endpoint(section, registry)? {
                        if let Some(previous) = table.transmitters.get(&endpoint.tag) {
                            debug!(tag = %endpoint.tag, previous = %previous, "Replacing transmitter");
                        }
                        table.transmitters.insert(endpoint.tag, endpoint.surface);
                    }
                }
                RECEIVER_SECTION => {
                    if let Some(endpoint) = read_endpoint(section, registry)? {
                        debug!(tag = %endpoint.tag, surface = %endpoint.surface, "Added receiver");
                        table
                            .receivers
                            .entry(endpoint.tag)
                            .or_default()
                            .push(endpoint.surface);
                    }
                }
                other => debug!(section = %other, "Ignoring section"),
            }
        }

        Ok(table)
    }

    pub fn transmitters(&self) -> &BTreeMap<String, SurfaceRef> {
        &self.transmitters
    }

    pub fn receivers(&self) -> &BTreeMap<String, Vec<SurfaceRef>> {
        &self.receivers
    }

    /// Receivers registered for `tag`, empty if none
    pub fn receivers_for(&self, tag: &str) -> &[SurfaceRef] {
        self.receivers.get(tag).map(Vec::as_slice).unwrap_or_default()
    }

    /// Distinct receiver tags, one listener each
    pub fn subscriptions(&self) -> impl Iterator<Item = &str> {
        self.receivers.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.transmitters.is_empty() && self.receivers.is_empty()
    }
}

fn read_endpoint(
    section: &ConfigSection,
    registry: &dyn SurfaceRegistry,
) -> Result<Option<Endpoint>, ConfigError> {
    let block = section.get("block", "");
    if block.is_empty() {
        warn!(section = %section.name(), "Missing block configuration in section, skipping");
        return Ok(None);
    }

    let index = section.get_int("surface", 0)?;
    let surface = SurfaceRef::new(block, index);

    if let Err(e) = registry.resolve_ref(&surface) {
        warn!(section = %section.name(), surface = %surface, error = %e, "Skipping unresolved surface");
        return Ok(None);
    }

    let tag = match section.get("tag", "") {
        "" => block,
        tag => tag,
    };

    Ok(Some(Endpoint {
        tag: tag.to_string(),
        surface,
    }))
}
