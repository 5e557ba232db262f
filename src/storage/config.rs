//! Selector configuration files
//!
//! A configuration document is TOML unless its path ends in `.json`.
//! The default location is `config.toml` in the user config directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::debug;

use crate::domain::{ConfigError, SelectorConfig};

/// On-disk encoding of a configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }

    pub fn parse(&self, content: &str) -> Result<SelectorConfig, ConfigError> {
        match self {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
        }
    }

    pub fn render(&self, config: &SelectorConfig) -> Result<String> {
        match self {
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).context("Failed to serialize config as TOML")
            }
            ConfigFormat::Json => {
                serde_json::to_string_pretty(config).context("Failed to serialize config as JSON")
            }
        }
    }
}

/// Reads and writes one configuration document
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default per-user location
    pub fn user_default() -> Result<Self> {
        Self::default_path()
            .map(Self::new)
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "taskpick", "taskpick")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ConfigFormat {
        ConfigFormat::from_path(&self.path)
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads and validates the document
    pub fn load(&self) -> Result<SelectorConfig> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config: {}", self.path.display()))?;

        let config = self
            .format()
            .parse(&content)
            .with_context(|| format!("Failed to parse config: {}", self.path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config: {}", self.path.display()))?;

        debug!(path = %self.path.display(), strategy = %config.strategy, "loaded config");
        Ok(config)
    }

    /// Loads the document, or the defaults when the file does not exist
    pub fn load_or_default(&self) -> Result<SelectorConfig> {
        if self.exists() {
            self.load()
        } else {
            Ok(SelectorConfig::default())
        }
    }

    pub fn save(&self, config: &SelectorConfig) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = self.format().render(config)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write config: {}", self.path.display()))
    }
}
