//! Append-only outcome ledger.
//!
//! The ledger is the run's only durable state: one CSV row per processed
//! record, `alias,new_pin,status,message`. The file is created with its
//! header exactly once and is never truncated or rewritten afterwards --
//! re-running against the same ledger appends.
//!
//! Every append is flushed and synced before returning, so a crash can lose
//! at most the record currently in flight, never produce a partial row.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::LedgerError;
use crate::models::LedgerEntry;

const HEADER: [&str; 4] = ["alias", "new_pin", "status", "message"];

/// Handle on the open ledger file for the duration of a run.
pub struct Ledger {
    path: PathBuf,
    /// Kept alongside the writer so appends can be synced to disk.
    file: File,
    writer: csv::Writer<File>,
}

impl Ledger {
    /// Open the ledger at `path`, creating it with the fixed header row if
    /// it does not exist yet. An existing ledger is left untouched and will
    /// only ever be appended to. Safe to call at the start of every run.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let needs_header = !path.exists() || fs::metadata(&path)?.len() == 0;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file.try_clone()?);

        if needs_header {
            writer.write_record(HEADER)?;
            writer.flush()?;
            file.sync_data()?;
            info!(path = %path.display(), "created ledger");
        } else {
            info!(path = %path.display(), "appending to existing ledger");
        }

        Ok(Self { path, file, writer })
    }

    /// Append one entry and make it durable before returning.
    pub fn append(&mut self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        self.writer.write_record([
            entry.alias.as_str(),
            entry.new_pin.as_str(),
            entry.status.ledger_label(),
            entry.message.as_str(),
        ])?;
        self.writer.flush()?;
        self.file.sync_data()?;

        debug!(alias = %entry.alias, status = %entry.status, "ledger entry appended");
        Ok(())
    }

    /// Path this ledger writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Deserialize)]
struct LedgerRow {
    alias: String,
    status: String,
}

/// Read a pre-existing ledger and return the aliases already marked
/// `success`. A missing ledger yields an empty set.
pub fn completed_aliases<P: AsRef<Path>>(path: P) -> Result<HashSet<String>, LedgerError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut done = HashSet::new();
    for row in reader.deserialize() {
        let row: LedgerRow = row?;
        if row.status == "success" {
            done.insert(row.alias);
        }
    }

    debug!(path = %path.display(), count = done.len(), "loaded completed aliases");
    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InputRecord, RecordStatus};

    fn entry(alias: &str, pin: &str, status: RecordStatus, message: &str) -> LedgerEntry {
        LedgerEntry::new(&InputRecord::new(alias, pin), status, message)
    }

    #[test]
    fn test_creates_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");

        {
            let mut ledger = Ledger::open(&path).unwrap();
            ledger
                .append(&entry("jsmith", "483920", RecordStatus::Success, "PIN updated"))
                .unwrap();
        }
        {
            let mut ledger = Ledger::open(&path).unwrap();
            ledger
                .append(&entry("ghost", "1234", RecordStatus::NotFound, "User not found"))
                .unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "alias,new_pin,status,message");
        assert_eq!(lines[1], "jsmith,483920,success,PIN updated");
        assert_eq!(lines[2], "ghost,1234,failed,User not found");
    }

    #[test]
    fn test_reopen_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");

        {
            let mut ledger = Ledger::open(&path).unwrap();
            ledger
                .append(&entry("a", "1111", RecordStatus::Success, "PIN updated"))
                .unwrap();
        }
        let before = fs::read_to_string(&path).unwrap();

        // Re-opening without writing must leave the file byte-identical.
        let _ledger = Ledger::open(&path).unwrap();
        let after = fs::read_to_string(&path).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_statuses_collapse_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");

        let mut ledger = Ledger::open(&path).unwrap();
        ledger
            .append(&entry("a", "1", RecordStatus::Skipped, "Missing data"))
            .unwrap();
        ledger
            .append(&entry("b", "2", RecordStatus::ResolveFailed, "HTTP 500"))
            .unwrap();
        ledger
            .append(&entry("c", "3", RecordStatus::UpdateFailed, "HTTP 403"))
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let statuses: Vec<&str> = contents
            .lines()
            .skip(1)
            .map(|l| l.split(',').nth(2).unwrap())
            .collect();
        assert_eq!(statuses, vec!["skipped", "failed", "failed"]);
    }

    #[test]
    fn test_completed_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");

        let mut ledger = Ledger::open(&path).unwrap();
        ledger
            .append(&entry("jsmith", "1", RecordStatus::Success, "PIN updated"))
            .unwrap();
        ledger
            .append(&entry("ghost", "2", RecordStatus::NotFound, "User not found"))
            .unwrap();
        ledger
            .append(&entry("mlopez", "3", RecordStatus::Success, "PIN updated"))
            .unwrap();
        drop(ledger);

        let done = completed_aliases(&path).unwrap();
        assert_eq!(done.len(), 2);
        assert!(done.contains("jsmith"));
        assert!(done.contains("mlopez"));
        assert!(!done.contains("ghost"));
    }

    #[test]
    fn test_completed_aliases_missing_ledger() {
        let done = completed_aliases("/nonexistent/ledger.csv").unwrap();
        assert!(done.is_empty());
    }
}
