//! Notification journal replay

use anyhow::{bail, Result};
use biogate_persistence::JournalFilter;
use chrono::NaiveDate;

use crate::db::Session;
use crate::KindArg;

/// Print journal entries between `from` and `to` matching the filters
pub fn replay(
    session: &Session,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    kinds: Option<Vec<KindArg>>,
    member: Option<i64>,
) -> Result<()> {
    let Some(reader) = session.journal_reader() else {
        bail!("Journal is disabled; set journal.enabled = true in the configuration");
    };

    let entries = match from {
        Some(from) => {
            let to = to.unwrap_or_else(|| session.ctx().now().date());
            reader.read_range(from, to)?
        }
        None => {
            let mut entries = reader.read_all()?;
            if let Some(to) = to {
                entries.retain(|e| e.notification.timestamp.date() <= to);
            }
            entries
        }
    };

    let mut filter = JournalFilter::new();
    if let Some(kinds) = kinds {
        filter = filter.kinds(kinds.into_iter().map(KindArg::to_core_kind).collect());
    }
    if let Some(member_id) = member {
        filter = filter.member(member_id);
    }
    let entries = filter.apply(entries);

    if entries.is_empty() {
        println!("No journal entries found.");
        return Ok(());
    }
    for entry in &entries {
        println!("{}  {}", entry.id, entry.notification);
    }
    println!("\nTotal: {} entries", entries.len());
    Ok(())
}
