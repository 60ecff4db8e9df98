//! Process configuration, loaded from YAML

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogdError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub probes: ProbesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Where the catalog is persisted on shutdown and restored on startup
    pub snapshot_path: Option<PathBuf>,
    /// Catalog document loaded when no snapshot exists yet
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbesConfig {
    pub interval_secs: u64,
    pub timeout_ms: u64,
    /// Connections slower than this are reported as degraded
    pub slow_threshold_ms: u64,
    pub targets: Vec<ProbeTarget>,
}

impl Default for ProbesConfig {
    fn default() -> Self {
        Self { interval_secs: 30, timeout_ms: 2000, slow_threshold_ms: 500, targets: Vec::new() }
    }
}

impl ProbesConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }
}

/// A TCP endpoint probed on behalf of a catalog service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeTarget {
    pub service: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

impl Config {
    /// Loads the configuration file, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path).map_err(|e| {
            CatalogdError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| CatalogdError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Rejects values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(CatalogdError::Config("server.port must not be 0".to_string()));
        }
        if self.probes.interval_secs == 0 {
            return Err(CatalogdError::Config("probes.interval_secs must be positive".to_string()));
        }
        if self.probes.timeout_ms == 0 {
            return Err(CatalogdError::Config("probes.timeout_ms must be positive".to_string()));
        }
        if self.probes.slow_threshold_ms >= self.probes.timeout_ms {
            return Err(CatalogdError::Config(
                "probes.slow_threshold_ms must be below probes.timeout_ms".to_string(),
            ));
        }
        for target in &self.probes.targets {
            if target.address.trim().is_empty() {
                return Err(CatalogdError::Config(format!(
                    "Probe target for '{}' has an empty address",
                    target.service
                )));
            }
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port).parse().map_err(|e| {
            CatalogdError::Config(format!(
                "Invalid listen address {}:{}: {}",
                self.server.host, self.server.port, e
            ))
        })
    }
}
