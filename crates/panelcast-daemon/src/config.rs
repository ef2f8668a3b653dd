//! Configuration loading and validation

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default, rename = "block")]
    pub blocks: Vec<BlockConfig>,
    #[serde(default, rename = "node")]
    pub nodes: Vec<NodeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Interval between replication cycles in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Root directory of the file-backed text surfaces
    #[serde(default = "default_surfaces_dir")]
    pub surfaces_dir: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            surfaces_dir: default_surfaces_dir(),
        }
    }
}

fn default_tick_interval() -> u64 {
    1667 // 100 game ticks at 60 Hz
}

fn default_surfaces_dir() -> PathBuf {
    PathBuf::from("./surfaces")
}

/// A block that may provide text surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockConfig {
    /// Block name as referenced by `block=` in replication configs
    pub name: String,
    /// Number of text surfaces (0 = not a text surface provider)
    #[serde(default)]
    pub surfaces: usize,
}

/// One replication program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Name used in logs
    pub name: String,
    /// Path to the replication configuration text
    pub custom_data: PathBuf,
}

impl Config {
    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.daemon.tick_interval_ms == 0 {
            bail!("daemon.tick_interval_ms must be greater than zero");
        }

        let mut seen = HashSet::new();
        for block in &self.blocks {
            if !seen.insert(block.name.as_str()) {
                warn!(block = %block.name, "Duplicate block definition, last one wins");
            }
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                bail!("duplicate node name '{}'", node.name);
            }
        }

        Ok(())
    }

    /// Resolve a node's custom data path relative to the config file
    pub fn custom_data_path(&self, node: &NodeConfig, config_path: &Path) -> PathBuf {
        if node.custom_data.is_absolute() {
            return node.custom_data.clone();
        }
        config_path
            .parent()
            .unwrap_or(Path::new("."))
            .join(&node.custom_data)
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        config
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [daemon]
            tick_interval_ms = 250
            surfaces_dir = "/var/lib/panelcast"

            [[block]]
            name = "Cockpit"
            surfaces = 4

            [[block]]
            name = "Hangar Door"

            [[node]]
            name = "bridge"
            custom_data = "bridge.ini"
            "#,
        )
        .unwrap();

        assert_eq!(config.daemon.tick_interval_ms, 250);
        assert_eq!(config.daemon.surfaces_dir, PathBuf::from("/var/lib/panelcast"));
        assert_eq!(config.blocks.len(), 2);
        assert_eq!(config.blocks[0].surfaces, 4);
        assert_eq!(config.blocks[1].surfaces, 0);
        assert_eq!(config.nodes[0].name, "bridge");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.daemon.tick_interval_ms, 1667);
        assert_eq!(config.daemon.surfaces_dir, PathBuf::from("./surfaces"));
        assert!(config.blocks.is_empty());
        assert!(config.nodes.is_empty());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.daemon.tick_interval_ms, 1667);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("panelcast.toml");
        std::fs::write(&path, "[daemon]\ntick_interval_ms = 0\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let config: Config = toml::from_str(
            "[[node]]\nname = \"a\"\ncustom_data = \"a.ini\"\n[[node]]\nname = \"a\"\ncustom_data = \"b.ini\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_data_relative_to_config() {
        let config = Config::default();
        let node = NodeConfig {
            name: "bridge".to_string(),
            custom_data: PathBuf::from("bridge.ini"),
        };
        assert_eq!(
            config.custom_data_path(&node, Path::new("/etc/panelcast/panelcast.toml")),
            PathBuf::from("/etc/panelcast/bridge.ini")
        );
    }
}
