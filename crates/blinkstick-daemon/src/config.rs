//! Configuration management.

use anyhow::{Context, Result};
use blinkstick_node::NodeConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP input configuration
    #[serde(default)]
    pub web: WebConfig,

    /// Node instances, one per `[[node]]` table
    #[serde(default = "default_nodes", rename = "node")]
    pub nodes: Vec<NodeConfig>,
}

/// HTTP input configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Enable the HTTP server
    #[serde(default = "default_enable")]
    pub enable: bool,

    /// Server listen address (e.g., "127.0.0.1:8687")
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enable: default_enable(),
            listen: default_listen(),
        }
    }
}

// Default value functions
fn default_enable() -> bool {
    true
}

fn default_listen() -> String {
    "127.0.0.1:8687".to_string()
}

fn default_nodes() -> Vec<NodeConfig> {
    vec![NodeConfig::default()]
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        Self::parse(&content)
    }

    /// Parses and validates TOML configuration.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;

        let mut names = HashSet::new();
        for node in &config.nodes {
            if !names.insert(node.name.as_str()) {
                anyhow::bail!("Duplicate node name: {}", node.name);
            }
        }
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path.as_ref(), content).context("Failed to write configuration file")?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig::default(),
            nodes: default_nodes(),
        }
    }
}
