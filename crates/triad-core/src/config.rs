//! Configuration system for Triad.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $TRIAD_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/triad/config.toml
//!   3. ~/.config/triad/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::partition::PART_COUNT;

/// Top-level configuration. One file serves all three binaries; each reads
/// only its own section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriadConfig {
    pub coordinator: CoordinatorConfig,
    pub node: NodeConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Address the coordinator listens on for client connections.
    pub listen_addr: String,
    /// The three storage node addresses, in part order: part `i` always
    /// goes to `storage_nodes[i]`.
    pub storage_nodes: Vec<String>,
    /// Directory for the coordinator's scratch blobs (inbound buffering,
    /// reassembly, and the local part copies DELETE operates on).
    pub storage_dir: PathBuf,
    /// Per-read socket timeout in seconds. 0 disables the timeout.
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Address this storage node listens on.
    pub listen_addr: String,
    /// Directory holding this node's part blobs.
    pub storage_dir: PathBuf,
    /// Per-read socket timeout in seconds. 0 disables the timeout.
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Coordinator address the CLI connects to.
    pub coordinator_addr: String,
    /// Where received files are written.
    pub download_dir: PathBuf,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default per-read socket timeout. The original protocol had none; a
/// silent peer stalled its handler forever. The timeout changes no
/// success-path behavior.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5000".to_string(),
            storage_nodes: vec![
                "127.0.0.1:5001".to_string(),
                "127.0.0.1:5002".to_string(),
                "127.0.0.1:5003".to_string(),
            ],
            storage_dir: data_dir().join("coordinator"),
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5001".to_string(),
            storage_dir: data_dir().join("node"),
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            coordinator_addr: "127.0.0.1:5000".to_string(),
            download_dir: data_dir().join("downloads"),
        }
    }
}

impl CoordinatorConfig {
    /// Part `i` maps to `storage_nodes[i]`, so the list length is part of
    /// the protocol, not a tunable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_nodes.len() != PART_COUNT {
            return Err(ConfigError::InvalidNodeCount(self.storage_nodes.len()));
        }
        Ok(())
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_or_tmp().join(".config"))
        .join("triad")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_or_tmp().join(".local").join("share"))
        .join("triad")
}

fn home_or_tmp() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("expected exactly {PART_COUNT} storage nodes, got {0}")]
    InvalidNodeCount(usize),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl TriadConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            TriadConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("TRIAD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&TriadConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply TRIAD_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TRIAD_COORDINATOR__LISTEN_ADDR") {
            self.coordinator.listen_addr = v;
        }
        if let Ok(v) = std::env::var("TRIAD_COORDINATOR__STORAGE_DIR") {
            self.coordinator.storage_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TRIAD_NODE__LISTEN_ADDR") {
            self.node.listen_addr = v;
        }
        if let Ok(v) = std::env::var("TRIAD_NODE__STORAGE_DIR") {
            self.node.storage_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TRIAD_CLIENT__COORDINATOR_ADDR") {
            self.client.coordinator_addr = v;
        }
        if let Ok(v) = std::env::var("TRIAD_CLIENT__DOWNLOAD_DIR") {
            self.client.download_dir = PathBuf::from(v);
        }
    }
}
