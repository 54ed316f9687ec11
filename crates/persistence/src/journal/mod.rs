//! Notification journal
//!
//! Append-only JSONL files of published notifications, one file per day.

pub mod reader;
pub mod store;

pub use reader::{JournalFilter, JournalReader};
pub use store::{JournalEntry, JournalStore};
