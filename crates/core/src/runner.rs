//! Batch runner -- drives each input record through resolution, update,
//! and ledgering, with pacing between records.
//!
//! Per-record state machine (every non-pending state is terminal and maps
//! to exactly one ledger entry):
//!
//! `Pending → Skipped | NotFound | ResolveFailed | UpdateFailed | Success`
//!
//! Records are processed strictly in input order, one at a time. Remote
//! failures never abort the run; a ledger write failure always does, since
//! continuing would silently lose audit data.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::ResumeMode;
use crate::directory::DirectoryApi;
use crate::errors::CoreError;
use crate::ledger::{self, Ledger};
use crate::models::{InputRecord, LedgerEntry, RecordStatus, RunSummary};
use crate::pacing::Pacer;

/// Orchestrates one batch run.
pub struct BatchRunner<'a> {
    directory: &'a dyn DirectoryApi,
    pacer: &'a dyn Pacer,
    resume: ResumeMode,
}

impl<'a> BatchRunner<'a> {
    pub fn new(directory: &'a dyn DirectoryApi, pacer: &'a dyn Pacer, resume: ResumeMode) -> Self {
        Self {
            directory,
            pacer,
            resume,
        }
    }

    /// Process every record, appending one ledger entry per record before
    /// advancing to the next. Returns the summary for this invocation only.
    pub async fn run(
        &self,
        records: &[InputRecord],
        ledger: &mut Ledger,
    ) -> Result<RunSummary, CoreError> {
        let completed = match self.resume {
            ResumeMode::Append => HashSet::new(),
            ResumeMode::SkipSuccesses => ledger::completed_aliases(ledger.path())?,
        };

        let mut summary = RunSummary {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        info!(count = records.len(), "starting PIN update run");

        for (index, record) in records.iter().enumerate() {
            let (status, message) = self.process_record(record, &completed).await;

            // The outcome must be durable before the next record starts.
            let entry = LedgerEntry::new(record, status, message);
            ledger.append(&entry)?;
            summary.record(status);

            info!(alias = %record.alias, status = %status, "record processed");

            if index + 1 < records.len() {
                self.pacer.pause().await;
            }
        }

        summary.finished_at = Some(Utc::now());
        info!(
            success = summary.success,
            failed = summary.failed(),
            skipped = summary.skipped,
            "PIN update run completed"
        );
        Ok(summary)
    }

    /// Drive one record to its terminal state. Per-record errors are
    /// converted into the status + message pair for the ledger, never
    /// returned to the caller.
    async fn process_record(
        &self,
        record: &InputRecord,
        completed: &HashSet<String>,
    ) -> (RecordStatus, String) {
        if !record.is_complete() {
            warn!(alias = %record.alias, "skipping record with missing data");
            return (RecordStatus::Skipped, "Missing data".to_string());
        }

        if completed.contains(&record.alias) {
            info!(alias = %record.alias, "alias already succeeded in a prior run");
            return (
                RecordStatus::Skipped,
                "Already updated in a previous run".to_string(),
            );
        }

        let object_id = match self.directory.resolve_alias(&record.alias).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!(alias = %record.alias, "no user found for alias");
                return (RecordStatus::NotFound, "User not found".to_string());
            }
            Err(e) => {
                error!(alias = %record.alias, error = %e, "alias lookup failed");
                return (
                    RecordStatus::ResolveFailed,
                    format!("Failed to look up alias: {}", e),
                );
            }
        };

        match self.directory.update_pin(&object_id, &record.new_pin).await {
            Ok(()) => (RecordStatus::Success, "PIN updated".to_string()),
            Err(e) => {
                error!(alias = %record.alias, error = %e, "PIN update failed");
                (
                    RecordStatus::UpdateFailed,
                    format!("Failed to update PIN: {}", e),
                )
            }
        }
    }
}
