//! Node configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use uaflow_graph::ModelSeed;
use uaflow_server::{ServerConfig, DEFAULT_PORT};

/// Directory holding a project-local configuration.
pub const CONFIG_DIR: &str = ".uaflow";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowConfig {
    pub server: ServerSection,
    pub browser: BrowserSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSection {
    pub port: u16,
    pub name: String,
    /// JSON model seed loaded before the vendor model.
    pub seed: Option<PathBuf>,
    pub bind: IpAddr,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            name: "uaflow".to_string(),
            seed: None,
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserSection {
    pub endpoint: String,
    /// Persisted browse root; wins over message topics.
    pub topic: Option<String>,
    pub step_timeout_ms: u64,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            endpoint: format!("ws://localhost:{}", DEFAULT_PORT),
            topic: None,
            step_timeout_ms: 10_000,
        }
    }
}

impl BrowserSection {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}

impl FlowConfig {
    /// Loads the configuration.
    ///
    /// An explicit path must exist. Otherwise `./.uaflow/config.json` and
    /// then the user config directory are tried, falling back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        for candidate in Self::search_paths() {
            if candidate.is_file() {
                return Self::from_path(&candidate);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![Path::new(CONFIG_DIR).join(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("uaflow").join(CONFIG_FILE));
        }
        paths
    }

    /// Writes the default configuration into `<dir>/.uaflow/config.json`.
    ///
    /// Returns `None` if a configuration is already there.
    pub fn write_default(dir: &Path) -> Result<Option<PathBuf>> {
        let config_dir = dir.join(CONFIG_DIR);
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            return Ok(None);
        }

        fs::create_dir_all(&config_dir)?;
        fs::write(&path, serde_json::to_string_pretty(&Self::default())?)?;
        Ok(Some(path))
    }

    /// Resolves the server section, loading the seed file if one is set.
    pub fn server_config(&self) -> Result<ServerConfig> {
        let seed = match &self.server.seed {
            Some(path) => ModelSeed::from_path(path)
                .with_context(|| format!("failed to load seed {}", path.display()))?,
            None => ModelSeed::default(),
        };

        Ok(ServerConfig {
            name: self.server.name.clone(),
            bind: self.server.bind,
            port: self.server.port,
            seed,
        })
    }
}
