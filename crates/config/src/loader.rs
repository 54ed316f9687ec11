//! Configuration loader

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::BiogateConfig;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found
    #[error("config file not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation error
    #[error("validation error: {0}")]
    Validation(String),
}

/// Loads and validates [`BiogateConfig`]
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config: BiogateConfig,

    /// Path the configuration was read from
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create loader with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: BiogateConfig = toml::from_str(&content)?;

        Self::validate(&config)?;
        tracing::debug!(path = %path.display(), "Configuration loaded");

        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Load configuration from string
    pub fn load_str(content: &str) -> Result<Self, ConfigError> {
        let config: BiogateConfig = toml::from_str(content)?;
        Self::validate(&config)?;

        Ok(Self {
            config,
            config_path: None,
        })
    }

    /// Current configuration
    #[inline]
    pub fn get(&self) -> &BiogateConfig {
        &self.config
    }

    /// Consume the loader
    pub fn into_config(self) -> BiogateConfig {
        self.config
    }

    /// File the configuration came from, if any
    pub fn path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Override the database URL (command-line `--db`)
    pub fn override_database_url(&mut self, url: &str) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        config.database.url = url.to_string();
        Self::validate(&config)?;
        self.config = config;
        Ok(())
    }

    /// Validate configuration
    fn validate(config: &BiogateConfig) -> Result<(), ConfigError> {
        if config.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url is empty".to_string()));
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if config.devices.connect_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "devices.connect_timeout_ms must be positive".to_string(),
            ));
        }
        if config.notify.channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "notify.channel_capacity must be at least 1".to_string(),
            ));
        }
        if config.journal.enabled && config.journal.dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "journal.dir is empty while the journal is enabled".to_string(),
            ));
        }

        Ok(())
    }
}
