//! Domain model types used throughout pinsync.
//!
//! These types bridge the input file, the batch runner, and the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// One row of the input file: the account alias and the PIN to set.
///
/// Both fields default to empty when the column is absent, so a malformed
/// row is skipped by the runner rather than aborting the whole run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputRecord {
    #[serde(default)]
    pub alias: String,

    #[serde(default)]
    pub new_pin: String,
}

impl InputRecord {
    pub fn new(alias: impl Into<String>, new_pin: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            new_pin: new_pin.into(),
        }
    }

    /// A record is processable only when both fields are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.alias.is_empty() && !self.new_pin.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Record status
// ---------------------------------------------------------------------------

/// Terminal state of one processed record.
///
/// The ledger file only distinguishes `skipped` / `failed` / `success`; the
/// three failure variants collapse to `failed` there and are told apart by
/// the message column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Record had missing data, or was already completed in a prior run.
    Skipped,
    /// The alias matched no account in the directory.
    NotFound,
    /// The lookup call itself failed (HTTP error or transport failure).
    ResolveFailed,
    /// The alias resolved but the PIN update was rejected.
    UpdateFailed,
    /// PIN updated, confirmed by the expected 204.
    Success,
}

impl RecordStatus {
    /// The status value serialized into the ledger file.
    pub fn ledger_label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Success => "success",
            Self::NotFound | Self::ResolveFailed | Self::UpdateFailed => "failed",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped"),
            Self::NotFound => write!(f, "not_found"),
            Self::ResolveFailed => write!(f, "resolve_failed"),
            Self::UpdateFailed => write!(f, "update_failed"),
            Self::Success => write!(f, "success"),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger entries
// ---------------------------------------------------------------------------

/// One appended ledger row: `alias,new_pin,status,message`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub alias: String,
    pub new_pin: String,
    pub status: RecordStatus,
    pub message: String,
}

impl LedgerEntry {
    pub fn new(record: &InputRecord, status: RecordStatus, message: impl Into<String>) -> Self {
        Self {
            alias: record.alias.clone(),
            new_pin: record.new_pin.clone(),
            status,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Aggregated outcome counts for a single invocation.
///
/// Counts only the entries written during this run, never the whole
/// historical ledger file. In-memory only.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub resolve_failed: usize,
    pub update_failed: usize,
    pub success: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn record(&mut self, status: RecordStatus) {
        self.total += 1;
        match status {
            RecordStatus::Skipped => self.skipped += 1,
            RecordStatus::NotFound => self.not_found += 1,
            RecordStatus::ResolveFailed => self.resolve_failed += 1,
            RecordStatus::UpdateFailed => self.update_failed += 1,
            RecordStatus::Success => self.success += 1,
        }
    }

    /// Total records that ended in any failure state.
    pub fn failed(&self) -> usize {
        self.not_found + self.resolve_failed + self.update_failed
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records: {} updated, {} skipped, {} not found, {} lookup errors, {} update errors",
            self.total,
            self.success,
            self.skipped,
            self.not_found,
            self.resolve_failed,
            self.update_failed
        )
    }
}
