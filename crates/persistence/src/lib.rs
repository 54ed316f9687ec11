//! # Biogate Persistence
//!
//! Persistence layer for Biogate - SQLite Rule Store + JSONL notification journal.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Database                               │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐ │
//! │  │   SQLite    │    │    JSONL    │    │     Repos       │ │
//! │  │  (state)    │    │  (journal)  │    │   (queries)     │ │
//! │  └─────────────┘    └─────────────┘    └─────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use biogate_persistence::{Database, MemberRepo};
//!
//! let db = Database::open("sqlite:biogate.db?mode=rwc", 5, Some("data/journal")).await?;
//! let member = MemberRepo::find_by_id(db.pool(), 1).await?;
//!
//! let mut tx = db.pool().begin().await?;
//! let rules = PermissionRepo::list_active(&mut *tx, 1).await?;
//! tx.commit().await?;
//! ```

pub mod error;
pub mod journal;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use journal::{JournalEntry, JournalFilter, JournalReader, JournalStore};
pub use sqlite::schema::{
    AccessLogRow, AttendanceRow, BranchRow, DeviceRow, EnrollmentLogRow, FingerprintTemplateRow,
    MemberRow, PermissionRow, RecognitionLogRow,
};
pub use sqlite::{
    init_database, init_in_memory, AccessLogFilter, AccessLogRepo, AttendanceFilter,
    AttendanceRepo, BranchRepo, DeviceRepo, EnrollmentLogRepo, MemberFilter, MemberRepo,
    PermissionRepo, RecognitionLogRepo, TemplateRepo, DEFAULT_PAGE_SIZE,
};

use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

/// Database facade - unified access to SQLite + journal
pub struct Database {
    pool: SqlitePool,
    journal: Option<Arc<JournalStore>>,
}

impl Database {
    /// Open the database, run migrations and open the journal if a directory is given
    ///
    /// # Arguments
    /// * `db_url` - SQLite database URL (e.g., "sqlite:biogate.db?mode=rwc")
    /// * `max_connections` - pool size
    /// * `journal_dir` - JSONL journal directory, `None` disables the journal
    pub async fn open<Q: AsRef<Path>>(
        db_url: &str,
        max_connections: u32,
        journal_dir: Option<Q>,
    ) -> PersistenceResult<Self> {
        let pool = init_database(db_url, max_connections).await?;
        let journal = journal_dir
            .map(JournalStore::new)
            .transpose()?
            .map(Arc::new);

        Ok(Self { pool, journal })
    }

    /// Isolated in-memory database without journal
    pub async fn in_memory() -> PersistenceResult<Self> {
        let pool = init_in_memory().await?;
        Ok(Self {
            pool,
            journal: None,
        })
    }

    /// Get SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Shared journal store, when enabled
    pub fn journal(&self) -> Option<Arc<JournalStore>> {
        self.journal.clone()
    }

    /// Reader over the journal directory, when enabled
    pub fn journal_reader(&self) -> Option<JournalReader> {
        self.journal
            .as_ref()
            .map(|store| JournalReader::new(store.base_path()))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
