//! Configuration, database session and status

use anyhow::{Context, Result};
use biogate_business::{ChannelObserver, ServiceContext, StatisticsService};
use biogate_config::{BiogateConfig, ConfigLoader};
use biogate_core::Notification;
use biogate_persistence::{Database, JournalReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Used when `--config` is not given and the file exists
pub const DEFAULT_CONFIG_FILE: &str = "biogate.toml";

/// Load the configuration file (or defaults) and apply `--db`
pub fn load_config(path: Option<&Path>, db_url: Option<&str>) -> Result<BiogateConfig> {
    let mut loader = match path {
        Some(path) => ConfigLoader::load_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            ConfigLoader::load_file(DEFAULT_CONFIG_FILE)
                .with_context(|| format!("Failed to load config {}", DEFAULT_CONFIG_FILE))?
        }
        None => ConfigLoader::new(),
    };

    if let Some(url) = db_url {
        loader.override_database_url(url)?;
    }
    Ok(loader.into_config())
}

/// File behind a SQLite URL, `None` for in-memory databases
pub fn database_file(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Open database plus the service context built on it
pub struct Session {
    config: BiogateConfig,
    db: Database,
    ctx: ServiceContext,
}

impl Session {
    pub async fn open(config: BiogateConfig) -> Result<Self> {
        if let Some(parent) = database_file(&config.database.url)
            .as_deref()
            .and_then(Path::parent)
        {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let journal_dir = config.journal.enabled.then(|| config.journal.dir.clone());
        let db = Database::open(
            &config.database.url,
            config.database.max_connections,
            journal_dir,
        )
        .await
        .context("Failed to open database")?;

        let timeout = Duration::from_millis(config.devices.connect_timeout_ms);
        let ctx = ServiceContext::new(&db, timeout).await;
        tracing::debug!(url = %config.database.url, journal = config.journal.enabled, "Session opened");

        Ok(Self { config, db, ctx })
    }

    pub fn config(&self) -> &BiogateConfig {
        &self.config
    }

    pub fn ctx(&self) -> &ServiceContext {
        &self.ctx
    }

    pub fn journal_reader(&self) -> Option<JournalReader> {
        self.db.journal_reader()
    }

    /// Subscribe a console observer sized by `notify.channel_capacity`
    pub async fn watch(&self) -> mpsc::Receiver<Notification> {
        let (observer, receiver) =
            ChannelObserver::channel("console", self.config.notify.channel_capacity);
        self.ctx.relay().subscribe(Arc::new(observer)).await;
        receiver
    }

    /// Wait for pending notification deliveries
    pub async fn flush(&self) {
        self.ctx.relay().flush().await;
    }

    pub async fn close(self) {
        self.db.close().await;
    }
}

/// Drain and print what a [`Session::watch`] receiver collected
pub fn print_events(receiver: &mut mpsc::Receiver<Notification>) {
    let mut printed = 0;
    while let Ok(notification) = receiver.try_recv() {
        println!("🔔 {}", notification);
        printed += 1;
    }
    if printed == 0 {
        println!("🔔 No notifications published");
    }
}

/// Show configuration and current figures
pub async fn show_status(session: &Session, json: bool) -> Result<()> {
    let config = session.config();
    let overview = StatisticsService::new(session.ctx()).overview().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("📊 Biogate Status");
    println!("   Database: {}", config.database.url);
    if config.journal.enabled {
        println!("   Journal:  {}", config.journal.dir.display());
    } else {
        println!("   Journal:  disabled");
    }
    println!();
    println!("   Members:        {}", overview.members);
    println!(
        "   Devices:        {} ({} online)",
        overview.devices_total, overview.devices_online
    );
    println!("   Access events:  {}", overview.access_events);
    println!();
    println!("   Today ({}):", overview.today.date);
    println!("     Checked in:   {}", overview.today.checked_in);
    println!("     Checked out:  {}", overview.today.checked_out);
    println!("     Still in:     {}", overview.today.still_in);

    Ok(())
}
