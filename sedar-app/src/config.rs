use anyhow::{Context, Result};
use sedar_core::{ScanPolicy, DEFAULT_SCAN_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub const CONFIG_PATH_ENV: &str = "SEDAR_CONFIG";
const DEFAULT_CONFIG_FILES: [&str; 2] = ["config.yaml", "config.json"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("scan.{0} must be greater than zero")]
    ZeroValue(&'static str),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, alias = "hydra")]
    pub panel: PanelConfig,
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelConfig {
    pub url: Option<String>,
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub url: Option<String>,
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_node_username")]
    pub username: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: String::new(),
            username: default_node_username(),
        }
    }
}

fn default_node_username() -> String {
    sedar_providers::filesystem::DEFAULT_USERNAME.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub interval_secs: u64,
    pub max_depth: usize,
    pub max_concurrent_instances: usize,
    pub request_timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let policy = ScanPolicy::default();
        Self {
            interval_secs: DEFAULT_SCAN_INTERVAL.as_secs(),
            max_depth: policy.max_depth,
            max_concurrent_instances: policy.max_concurrent_instances,
            request_timeout_secs: policy.request_timeout.as_secs(),
        }
    }
}

impl Config {
    /// Load from `SEDAR_CONFIG`, else the first of `config.yaml` and
    /// `config.json` in the working directory, then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = Self::resolve_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn resolve_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
            .with_context(|| {
                format!(
                    "No configuration found: set {} or create {}",
                    CONFIG_PATH_ENV,
                    DEFAULT_CONFIG_FILES.join(" or ")
                )
            })
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))
        }
    }

    /// Overlay `SEDAR_*` variables resolved through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SEDAR_PANEL_URL") {
            self.panel.url = Some(url);
        }
        if let Some(key) = lookup("SEDAR_PANEL_KEY") {
            self.panel.key = key;
        }
        if let Some(url) = lookup("SEDAR_NODE_URL") {
            self.node.url = Some(url);
        }
        if let Some(key) = lookup("SEDAR_NODE_KEY") {
            self.node.key = key;
        }
        if let Some(webhook) = lookup("SEDAR_DISCORD_WEBHOOK") {
            self.discord.webhook = Some(webhook);
        }
    }

    /// Rejects zero limits. Missing endpoints are only logged: the affected
    /// calls fail at runtime and are reported per sweep.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.interval_secs == 0 {
            return Err(ConfigError::ZeroValue("interval_secs"));
        }
        if self.scan.max_concurrent_instances == 0 {
            return Err(ConfigError::ZeroValue("max_concurrent_instances"));
        }
        if self.scan.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("request_timeout_secs"));
        }

        for endpoint in self.missing_endpoints() {
            warn!("No URL configured for {}", endpoint);
        }
        Ok(())
    }

    pub fn missing_endpoints(&self) -> Vec<&'static str> {
        let blank = |url: &Option<String>| url.as_deref().map_or(true, |u| u.trim().is_empty());

        let mut missing = Vec::new();
        if blank(&self.panel.url) {
            missing.push("panel");
        }
        if blank(&self.node.url) {
            missing.push("node");
        }
        if blank(&self.discord.webhook) {
            missing.push("discord webhook");
        }
        missing
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.scan.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.request_timeout_secs)
    }

    pub fn scan_policy(&self) -> ScanPolicy {
        ScanPolicy::default()
            .with_max_depth(self.scan.max_depth)
            .with_max_concurrent_instances(self.scan.max_concurrent_instances)
            .with_request_timeout(self.request_timeout())
    }
}
