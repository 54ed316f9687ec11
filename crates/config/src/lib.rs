//! Biogate Config - Configuration management
//!
//! TOML file with a default for every field, validated on load.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader};
pub use types::{
    BiogateConfig, DatabaseConfig, DevicesConfig, JournalConfig, LoggingConfig, NotifyConfig,
};
