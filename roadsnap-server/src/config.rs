use std::fs;
use std::path::{Path, PathBuf};

use roadsnap_core::{DEFAULT_SPEED_KMH, GraphSourceConfig};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub request_timeout_secs: u64,
    /// Requests handled at once per route
    pub concurrency_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
            concurrency_limit: 64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub nodes_path: PathBuf,
    pub roads_path: PathBuf,
    /// Where the built graph is persisted
    pub store_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            nodes_path: PathBuf::from("data/nodes.geojson"),
            roads_path: PathBuf::from("data/roads.geojson"),
            store_path: PathBuf::from("data/graph.json"),
        }
    }
}

impl DataConfig {
    pub fn source(&self) -> GraphSourceConfig {
        GraphSourceConfig {
            nodes_path: self.nodes_path.clone(),
            roads_path: self.roads_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutingConfig {
    pub speed_kmh: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl Config {
    /// Reads a TOML config file; without a path every default applies
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "server.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.server.concurrency_limit == 0 {
            return Err(ConfigError::Invalid(
                "server.concurrency_limit must be at least 1".to_string(),
            ));
        }
        if !(self.routing.speed_kmh.is_finite() && self.routing.speed_kmh > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "routing.speed_kmh must be positive, got {}",
                self.routing.speed_kmh
            )));
        }
        Ok(())
    }
}
