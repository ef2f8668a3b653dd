//! Application state and the replication tick loop

use anyhow::{Context, Result};
use panelcast_core::{ConfigSection, CycleReport, ReplicationLoop, ReplicationTable};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::bus::{LocalBus, LocalListener};
use crate::config::{Config, NodeConfig};
use crate::registry::FileSurfaceRegistry;

/// One replication program and its loop
pub struct Node {
    pub name: String,
    pub replication: ReplicationLoop<LocalListener>,
}

/// Snapshot of a node for `--check` output
#[derive(Debug, Serialize)]
pub struct NodeSummary<'a> {
    pub name: &'a str,
    pub table: &'a ReplicationTable,
}

/// Shared application state
pub struct AppState {
    /// File-backed surfaces shared by all nodes
    pub registry: FileSurfaceRegistry,
    /// Bus connecting every node
    pub bus: LocalBus,
    /// Nodes in configuration order
    pub nodes: Vec<Node>,
    /// Configuration
    pub config: Config,
}

impl AppState {
    /// Create new application state
    ///
    /// Every node's custom data is read and parsed exactly once here; a
    /// malformed replication config aborts startup.
    pub fn new(config: Config, config_path: &Path) -> Result<Self> {
        let registry = FileSurfaceRegistry::new(config.daemon.surfaces_dir.clone(), &config.blocks);
        let bus = LocalBus::new();

        let mut nodes = Vec::with_capacity(config.nodes.len());
        for node_config in &config.nodes {
            let path = config.custom_data_path(node_config, config_path);
            let node = load_node(node_config, &path, &registry, &bus)?;
            nodes.push(node);
        }

        Ok(Self {
            registry,
            bus,
            nodes,
            config,
        })
    }

    /// Run one cycle on every node, in configuration order
    pub fn tick(&mut self) -> CycleReport {
        let mut total = CycleReport::default();
        for node in &mut self.nodes {
            let report = node.replication.tick(&self.registry, &self.bus);
            if !report.is_idle() {
                debug!(node = %node.name, ?report, "Replication cycle");
            }
            total += report;
        }
        total
    }

    /// Tick on the configured interval
    ///
    /// Runs `ticks` cycles when given, otherwise until Ctrl-C.
    pub async fn run(&mut self, ticks: Option<u64>) -> Result<CycleReport> {
        let period = Duration::from_millis(self.config.daemon.tick_interval_ms);
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            nodes = self.nodes.len(),
            interval_ms = self.config.daemon.tick_interval_ms,
            "Replication loop started"
        );

        let mut total = CycleReport::default();
        let mut completed = 0u64;
        loop {
            if ticks.is_some_and(|limit| completed >= limit) {
                break;
            }

            tokio::select! {
                _ = timer.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping replication loop");
                    break;
                }
            }

            total += self.tick();
            completed += 1;
        }

        info!(cycles = completed, sent = total.sent, written = total.written, "Replication loop stopped");
        Ok(total)
    }

    pub fn summaries(&self) -> Vec<NodeSummary<'_>> {
        self.nodes
            .iter()
            .map(|node| NodeSummary {
                name: &node.name,
                table: node.replication.table(),
            })
            .collect()
    }
}

fn load_node(
    node: &NodeConfig,
    path: &Path,
    registry: &FileSurfaceRegistry,
    bus: &LocalBus,
) -> Result<Node> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read custom data for node '{}' at {}", node.name, path.display()))?;
    let root = ConfigSection::parse(&text)
        .with_context(|| format!("malformed replication config for node '{}'", node.name))?;
    let table = ReplicationTable::build(&root, registry)
        .with_context(|| format!("invalid replication config for node '{}'", node.name))?;

    info!(
        node = %node.name,
        transmitters = table.transmitters().len(),
        receiver_tags = table.receivers().len(),
        "Loaded replication table"
    );

    let replication = ReplicationLoop::new(table, bus);
    for tag in replication.table().subscriptions() {
        debug!(node = %node.name, tag = %tag, listeners = bus.listener_count(tag), "Subscribed");
    }

    Ok(Node {
        name: node.name.clone(),
        replication,
    })
}
