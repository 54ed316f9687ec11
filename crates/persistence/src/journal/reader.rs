//! Journal replay - read notifications back from JSONL files

use crate::error::PersistenceResult;
use crate::journal::store::{list_journal_files, JournalEntry, JournalStore};
use biogate_core::NotificationKind;
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Journal reader - reads entries from JSONL files
pub struct JournalReader {
    base_path: PathBuf,
}

impl JournalReader {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Read every entry of one file
    pub fn read_file(&self, file_path: &Path) -> PersistenceResult<Vec<JournalEntry>> {
        let file = File::open(file_path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }

        Ok(entries)
    }

    /// Entries of one day; empty when no file exists
    pub fn read_date(&self, date: NaiveDate) -> PersistenceResult<Vec<JournalEntry>> {
        let path = JournalStore::file_path(&self.base_path, date);
        if path.exists() {
            self.read_file(&path)
        } else {
            Ok(Vec::new())
        }
    }

    /// Entries from `from` to `to` inclusive, in write order
    pub fn read_range(&self, from: NaiveDate, to: NaiveDate) -> PersistenceResult<Vec<JournalEntry>> {
        let mut entries = Vec::new();
        for date in from.iter_days().take_while(|d| *d <= to) {
            entries.extend(self.read_date(date)?);
        }
        Ok(entries)
    }

    pub fn read_all(&self) -> PersistenceResult<Vec<JournalEntry>> {
        let mut entries = Vec::new();
        for path in list_journal_files(&self.base_path)? {
            entries.extend(self.read_file(&path)?);
        }
        Ok(entries)
    }
}

/// Filter over journal entries
#[derive(Debug, Clone, Default)]
pub struct JournalFilter {
    pub kinds: Option<Vec<NotificationKind>>,
    /// Matches the `member_id` field of the payload
    pub member_id: Option<i64>,
}

impl JournalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(mut self, kinds: Vec<NotificationKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    pub fn member(mut self, member_id: i64) -> Self {
        self.member_id = Some(member_id);
        self
    }

    pub fn matches(&self, entry: &JournalEntry) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&entry.notification.kind) {
                return false;
            }
        }
        if let Some(member_id) = self.member_id {
            if entry.notification.payload["member_id"].as_i64() != Some(member_id) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, entries: Vec<JournalEntry>) -> Vec<JournalEntry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biogate_core::Notification;
    use serde_json::json;
    use tempfile::tempdir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn seed(store: &JournalStore, day: u32, kind: NotificationKind, member_id: i64) {
        let at = date(day).and_hms_opt(10, 0, 0).unwrap();
        store
            .append(&Notification::new(kind, json!({ "member_id": member_id }), at))
            .unwrap();
    }

    #[test]
    fn test_read_range_spans_files() {
        let dir = tempdir().unwrap();
        let store = JournalStore::new(dir.path()).unwrap();
        seed(&store, 1, NotificationKind::CheckIn, 1);
        seed(&store, 2, NotificationKind::CheckOut, 1);
        seed(&store, 4, NotificationKind::AccessDecision, 2);

        let reader = JournalReader::new(dir.path());
        let entries = reader.read_range(date(2), date(4)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].notification.kind, NotificationKind::CheckOut);

        assert_eq!(reader.read_all().unwrap().len(), 3);
        assert!(reader.read_date(date(3)).unwrap().is_empty());
        assert!(reader.read_range(date(4), date(2)).unwrap().is_empty());
    }

    #[test]
    fn test_filter_by_kind_and_member() {
        let dir = tempdir().unwrap();
        let store = JournalStore::new(dir.path()).unwrap();
        seed(&store, 1, NotificationKind::CheckIn, 1);
        seed(&store, 1, NotificationKind::CheckIn, 2);
        seed(&store, 1, NotificationKind::AccessDecision, 1);

        let reader = JournalReader::new(dir.path());
        let all = reader.read_all().unwrap();

        let filter = JournalFilter::new()
            .kinds(vec![NotificationKind::CheckIn])
            .member(1);
        let hits = filter.apply(all);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "NTF_000001");
    }
}
