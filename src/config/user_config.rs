//! User configuration file parsing and editing

use crate::types::CliError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

/// A user server entry: either an override of a known server or a custom one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl UserConfig {
    /// Load a config file. A missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::parse(&content)
            .map_err(|e| CliError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> Result<Self, CliError> {
        toml::from_str(content)
            .map_err(|e| CliError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    pub fn to_toml(&self) -> Result<String, CliError> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Write the config, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, self.to_toml()?)?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn upsert_server(&mut self, name: &str, entry: ServerEntry) {
        self.servers.insert(name.to_string(), entry);
    }

    pub fn remove_server(&mut self, name: &str) -> bool {
        self.servers.remove(name).is_some()
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        self.servers.entry(name.to_string()).or_default().enabled = Some(enabled);
    }

    pub fn request_timeout_secs(&self) -> Option<u64> {
        self.settings.as_ref().and_then(|s| s.request_timeout_secs)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.settings.as_ref().and_then(|s| s.log_level.as_deref())
    }
}
