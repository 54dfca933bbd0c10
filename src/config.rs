use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub decrypt: DecryptConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourceConfig {
    /// Directory holding the account's chat store (the decrypted layout
    /// root containing `Msg/` or `db_storage/`).
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DecryptConfig {
    /// Hex-encoded store key. The `CHATGRAPH_KEY` environment variable
    /// takes precedence over this value.
    pub key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
        }
    }
}

fn default_max_nodes() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    // The artifact is private chat data; stay on loopback.
    "127.0.0.1".to_string()
}

impl Config {
    /// Configuration with defaults only, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// The store key, preferring the environment over the config file.
    pub fn resolve_key(&self) -> Option<String> {
        std::env::var("CHATGRAPH_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.decrypt.key.clone())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.analysis.max_nodes == 0 {
        anyhow::bail!("analysis.max_nodes must be > 0");
    }

    if config.server.port == 0 {
        anyhow::bail!("server.port must be > 0");
    }

    if config.server.host.is_empty() {
        anyhow::bail!("server.host must not be empty");
    }

    Ok(config)
}
