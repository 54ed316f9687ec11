//! JSONL journal writer
//!
//! Files are partitioned by the notification's own date:
//! `data/journal/notifications_2026-03-02.jsonl`

use crate::error::PersistenceResult;
use biogate_core::Notification;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

const FILE_PREFIX: &str = "notifications_";
const ID_PREFIX: &str = "NTF_";

/// One journal line: a sequence id plus the notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// NTF_000001, NTF_000002, ...
    pub id: String,
    #[serde(flatten)]
    pub notification: Notification,
}

impl JournalEntry {
    /// Numeric part of the id
    pub fn sequence(&self) -> Option<u64> {
        self.id.strip_prefix(ID_PREFIX)?.parse().ok()
    }
}

/// Journal store - appends notifications to JSONL files.
pub struct JournalStore {
    base_path: PathBuf,
    /// Next sequence number
    counter: AtomicU64,
    current_writer: Mutex<Option<JournalWriter>>,
}

struct JournalWriter {
    date: NaiveDate,
    writer: BufWriter<File>,
}

impl JournalStore {
    /// Open (creating if needed) the journal directory at `base_path`
    pub fn new<P: AsRef<Path>>(base_path: P) -> PersistenceResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let counter = Self::load_counter(&base_path)?;

        Ok(Self {
            base_path,
            counter: AtomicU64::new(counter),
            current_writer: Mutex::new(None),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resume numbering after the highest id already on disk
    fn load_counter(base_path: &Path) -> PersistenceResult<u64> {
        let mut max_id: u64 = 0;

        for path in list_journal_files(base_path)? {
            let content = fs::read_to_string(&path)?;
            for line in content.lines() {
                if let Ok(entry) = serde_json::from_str::<JournalEntry>(line) {
                    if let Some(seq) = entry.sequence() {
                        max_id = max_id.max(seq);
                    }
                }
            }
        }

        Ok(max_id + 1)
    }

    pub(crate) fn file_path(base_path: &Path, date: NaiveDate) -> PathBuf {
        base_path.join(format!("{}{}.jsonl", FILE_PREFIX, date.format("%Y-%m-%d")))
    }

    fn next_id(&self) -> String {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}{:06}", ID_PREFIX, id)
    }

    fn writer(&self) -> MutexGuard<'_, Option<JournalWriter>> {
        self.current_writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a notification and return the entry written
    pub fn append(&self, notification: &Notification) -> PersistenceResult<JournalEntry> {
        let date = notification.timestamp.date();
        let mut guard = self.writer();

        // Ids are taken under the lock so file order matches id order
        let entry = JournalEntry {
            id: self.next_id(),
            notification: notification.clone(),
        };
        let json = serde_json::to_string(&entry)?;

        let needs_new_file = guard.as_ref().map_or(true, |w| w.date != date);
        if needs_new_file {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(Self::file_path(&self.base_path, date))?;
            *guard = Some(JournalWriter {
                date,
                writer: BufWriter::new(file),
            });
        }

        if let Some(w) = guard.as_mut() {
            writeln!(w.writer, "{}", json)?;
            w.writer.flush()?;
        }

        Ok(entry)
    }

    /// All journal files, oldest first
    pub fn list_files(&self) -> PersistenceResult<Vec<PathBuf>> {
        list_journal_files(&self.base_path)
    }

    pub fn flush(&self) -> PersistenceResult<()> {
        if let Some(w) = self.writer().as_mut() {
            w.writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for JournalStore {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Journal files under `base_path`, sorted by name (and so by date)
pub(crate) fn list_journal_files(base_path: &Path) -> PersistenceResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !base_path.exists() {
        return Ok(files);
    }

    for entry in fs::read_dir(base_path)? {
        let path = entry?.path();
        let is_journal = path.extension().is_some_and(|ext| ext == "jsonl")
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(FILE_PREFIX));
        if is_journal {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use biogate_core::NotificationKind;
    use chrono::NaiveDateTime;
    use serde_json::json;
    use tempfile::tempdir;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn notification(day: u32) -> Notification {
        Notification::new(NotificationKind::CheckIn, json!({"member_id": 1}), at(day, 9))
    }

    #[test]
    fn test_append_writes_dated_file() {
        let dir = tempdir().unwrap();
        let store = JournalStore::new(dir.path()).unwrap();

        let entry = store.append(&notification(2)).unwrap();
        assert_eq!(entry.id, "NTF_000001");
        assert_eq!(entry.sequence(), Some(1));

        let files = store.list_files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("notifications_2026-03-02.jsonl"));

        let content = fs::read_to_string(&files[0]).unwrap();
        assert!(content.contains("NTF_000001"));
        assert!(content.contains("check_in"));
    }

    #[test]
    fn test_date_rollover_opens_new_file() {
        let dir = tempdir().unwrap();
        let store = JournalStore::new(dir.path()).unwrap();

        store.append(&notification(2)).unwrap();
        store.append(&notification(3)).unwrap();
        store.append(&notification(3)).unwrap();

        assert_eq!(store.list_files().unwrap().len(), 2);
    }

    #[test]
    fn test_counter_resumes_after_reopen() {
        let dir = tempdir().unwrap();

        {
            let store = JournalStore::new(dir.path()).unwrap();
            store.append(&notification(2)).unwrap();
            store.append(&notification(2)).unwrap();
        }

        let store = JournalStore::new(dir.path()).unwrap();
        let entry = store.append(&notification(4)).unwrap();
        assert_eq!(entry.id, "NTF_000003");
    }

    #[test]
    fn test_foreign_files_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("other.jsonl"), "not json\n").unwrap();

        let store = JournalStore::new(dir.path()).unwrap();
        assert!(store.list_files().unwrap().is_empty());
    }
}
