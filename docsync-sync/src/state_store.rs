//! Durable per-item bookkeeping.
//!
//! # Storage layout
//!
//! ```text
//! <state_dir>/
//!   processed.json        locator -> { revision, processed_at }
//!   failed.json           locator -> { last_error, failed_at, retry_count }
//!   pending_cleanup.json  locator -> queued_at
//!   removals.jsonl        append-only RemovalRecord audit
//! ```
//!
//! A locator has at most one live record: every mutation removes the
//! counterpart from the other map before both maps are saved. Each mutation
//! is persisted immediately so an interrupted run keeps everything it
//! finished. Access is serialized by the run lock; the store does no locking
//! of its own.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use docsync_core::{FailedRecord, Locator, ProcessedRecord, RemovalRecord, TrackedItem};

use crate::error::{io_err, SyncError};
use crate::persist::{load_or_default, save_atomic};

pub const PROCESSED_FILE: &str = "processed.json";
pub const FAILED_FILE: &str = "failed.json";
pub const PENDING_CLEANUP_FILE: &str = "pending_cleanup.json";
pub const REMOVALS_FILE: &str = "removals.jsonl";

#[derive(Debug)]
pub struct StateStore {
    dir: PathBuf,
    processed: BTreeMap<Locator, ProcessedRecord>,
    failed: BTreeMap<Locator, FailedRecord>,
    pending_cleanup: BTreeMap<Locator, DateTime<Utc>>,
}

impl StateStore {
    /// Open the store rooted at `dir`. Missing or corrupt files start empty.
    pub fn open(dir: &Path) -> Self {
        let mut processed: BTreeMap<Locator, ProcessedRecord> =
            load_or_default(&dir.join(PROCESSED_FILE));
        let failed: BTreeMap<Locator, FailedRecord> = load_or_default(&dir.join(FAILED_FILE));

        // A crash between the two saves can leave a locator in both files;
        // the failure is always the later write.
        processed.retain(|locator, _| !failed.contains_key(locator));

        Self {
            dir: dir.to_path_buf(),
            processed,
            failed,
            pending_cleanup: load_or_default(&dir.join(PENDING_CLEANUP_FILE)),
        }
    }

    pub fn get(&self, locator: &Locator) -> Option<TrackedItem> {
        if let Some(record) = self.processed.get(locator) {
            return Some(TrackedItem::Processed(record.clone()));
        }
        self.failed
            .get(locator)
            .map(|record| TrackedItem::Failed(record.clone()))
    }

    pub fn failed_record(&self, locator: &Locator) -> Option<&FailedRecord> {
        self.failed.get(locator)
    }

    pub fn processed(&self) -> &BTreeMap<Locator, ProcessedRecord> {
        &self.processed
    }

    pub fn failed(&self) -> &BTreeMap<Locator, FailedRecord> {
        &self.failed
    }

    /// `true` iff a Processed record exists with exactly `revision`.
    pub fn is_current(&self, locator: &Locator, revision: &str) -> bool {
        self.processed
            .get(locator)
            .is_some_and(|record| record.revision == revision)
    }

    pub fn mark_processed(&mut self, locator: &Locator, revision: &str) -> Result<(), SyncError> {
        self.mark_processed_at(locator, revision, Utc::now())
    }

    pub fn mark_processed_at(
        &mut self,
        locator: &Locator,
        revision: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        self.processed.insert(
            locator.clone(),
            ProcessedRecord {
                revision: revision.to_string(),
                processed_at: now,
            },
        );
        let had_failure = self.failed.remove(locator).is_some();
        self.save_processed()?;
        if had_failure {
            self.save_failed()?;
        }
        Ok(())
    }

    /// Record a failure and return the new retry count.
    pub fn mark_failed(&mut self, locator: &Locator, error: &str) -> Result<u32, SyncError> {
        self.mark_failed_at(locator, error, Utc::now())
    }

    pub fn mark_failed_at(
        &mut self,
        locator: &Locator,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<u32, SyncError> {
        let retry_count = self
            .failed
            .get(locator)
            .map_or(1, |record| record.retry_count.saturating_add(1));
        self.failed.insert(
            locator.clone(),
            FailedRecord {
                last_error: error.to_string(),
                failed_at: now,
                retry_count,
            },
        );
        let had_success = self.processed.remove(locator).is_some();
        self.save_failed()?;
        if had_success {
            self.save_processed()?;
        }
        Ok(retry_count)
    }

    /// Remove any record for `locator`. No-op when absent.
    pub fn clear(&mut self, locator: &Locator) -> Result<(), SyncError> {
        if self.processed.remove(locator).is_some() {
            self.save_processed()?;
        }
        if self.failed.remove(locator).is_some() {
            self.save_failed()?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Pending cleanup queue
    // -----------------------------------------------------------------------

    pub fn pending_cleanup(&self) -> &BTreeMap<Locator, DateTime<Utc>> {
        &self.pending_cleanup
    }

    /// Queue `locator` for another cleanup attempt. Keeps the original
    /// queue time when already queued.
    pub fn queue_cleanup(&mut self, locator: &Locator) -> Result<(), SyncError> {
        if self.pending_cleanup.contains_key(locator) {
            return Ok(());
        }
        self.pending_cleanup.insert(locator.clone(), Utc::now());
        self.save_pending_cleanup()
    }

    pub fn dequeue_cleanup(&mut self, locator: &Locator) -> Result<(), SyncError> {
        if self.pending_cleanup.remove(locator).is_some() {
            self.save_pending_cleanup()?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Removal audit
    // -----------------------------------------------------------------------

    /// Append one line to `removals.jsonl`.
    pub fn record_removal(&self, record: &RemovalRecord) -> Result<(), SyncError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        let path = self.dir.join(REMOVALS_FILE);
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| io_err(&path, e))
    }

    fn save_processed(&self) -> Result<(), SyncError> {
        save_atomic(&self.dir.join(PROCESSED_FILE), &self.processed)
    }

    fn save_failed(&self) -> Result<(), SyncError> {
        save_atomic(&self.dir.join(FAILED_FILE), &self.failed)
    }

    fn save_pending_cleanup(&self) -> Result<(), SyncError> {
        save_atomic(&self.dir.join(PENDING_CLEANUP_FILE), &self.pending_cleanup)
    }
}
