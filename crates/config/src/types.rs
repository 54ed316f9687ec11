//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiogateConfig {
    /// Rule Store connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Notification journal
    #[serde(default)]
    pub journal: JournalConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Device link settings
    #[serde(default)]
    pub devices: DevicesConfig,

    /// Notification relay settings
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite:data/biogate.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// JSONL notification journal configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Append every notification to the journal
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding `notifications_YYYY-MM-DD.jsonl` files
    #[serde(default = "default_journal_dir")]
    pub dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_journal_dir() -> PathBuf {
    PathBuf::from("data/journal")
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_journal_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Device link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicesConfig {
    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_connect_timeout() -> u64 {
    3000
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

/// Notification relay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Buffer size of channel observers
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}
