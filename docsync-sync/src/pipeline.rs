//! Run orchestrator: one reconciliation pass.
//!
//! lock → fetch manifest → diff against the committed snapshot → cleanup
//! saga over removed (and queued) locators → item pipeline over new,
//! changed and retryable-failed locators → commit snapshot → unlock.
//!
//! The snapshot advances even when items fail, since each failure is kept
//! by its own Failed record and retried from there. It does not advance when
//! the run is interrupted or when bookkeeping cannot be written.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use docsync_core::{paths, Config, Locator, Manifest, ManifestSource};

use crate::cancel::CancelFlag;
use crate::cleanup::{CleanupSaga, CleanupStatus};
use crate::diff::{diff, ManifestDiff};
use crate::error::SyncError;
use crate::item::{ItemCollaborators, ItemOutcome, ItemPipeline, ItemSettings};
use crate::lock::RunLock;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::snapshot;
use crate::state_store::StateStore;

/// Everything a run needs to know about where and how to work.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub state_dir: PathBuf,
    pub lock_path: PathBuf,
    pub item_delay: Duration,
    /// Treat an empty manifest after a non-empty snapshot as a real removal
    /// of every document instead of refusing it.
    pub allow_empty_manifest: bool,
    pub retry: RetryPolicy,
    pub item: ItemSettings,
}

impl RunSettings {
    pub fn from_config(home: &Path, config: &Config) -> Self {
        Self {
            state_dir: paths::state_dir(home),
            lock_path: paths::lock_path(home),
            item_delay: config.pipeline.item_delay(),
            allow_empty_manifest: config.pipeline.allow_empty_manifest,
            retry: RetryPolicy::from(&config.retry),
            item: ItemSettings {
                scratch_dir: paths::scratch_dir(home),
                artifacts_dir: paths::artifacts_dir(home),
                min_document_bytes: config.pipeline.min_document_bytes,
                min_text_chars: config.pipeline.min_text_chars,
                language: config.pipeline.language.clone(),
            },
        }
    }
}

#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub manifest: &'a dyn ManifestSource,
    pub item: ItemCollaborators<'a>,
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateReason {
    Added,
    Changed,
    /// Unchanged in the manifest but holding a Failed record.
    RetryFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub locator: Locator,
    pub revision: String,
    pub reason: CandidateReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Already processed at this exact revision.
    Current,
    /// Retry cap reached and cooldown still running.
    RetryExhausted { eligible_at: DateTime<Utc> },
}

/// What a run would do, computed without side effects.
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    pub diff: ManifestDiff,
    /// Removed locators plus queued cleanups still absent from the manifest.
    pub cleanup: Vec<Locator>,
    /// Queued cleanups whose locator is back in the manifest.
    pub reappeared: Vec<Locator>,
    pub process: Vec<Candidate>,
    pub skipped: Vec<(Locator, SkipReason)>,
}

pub fn plan(
    snapshot: &Manifest,
    manifest: &Manifest,
    store: &StateStore,
    retry: &RetryPolicy,
    now: DateTime<Utc>,
) -> RunPlan {
    let diff = diff(snapshot, manifest);

    let mut cleanup: Vec<Locator> = diff.removed.iter().cloned().collect();
    let mut reappeared = Vec::new();
    for locator in store.pending_cleanup().keys() {
        if manifest.contains_key(locator) {
            reappeared.push(locator.clone());
        } else if !diff.removed.contains(locator) {
            cleanup.push(locator.clone());
        }
    }
    cleanup.sort();

    let mut process = Vec::new();
    let mut skipped = Vec::new();
    for (locator, revision) in manifest {
        let failure = store.failed_record(locator);
        let reason = if diff.added.contains(locator) {
            CandidateReason::Added
        } else if diff.changed.contains(locator) {
            CandidateReason::Changed
        } else if failure.is_some() {
            CandidateReason::RetryFailed
        } else {
            continue;
        };

        if store.is_current(locator, revision) {
            skipped.push((locator.clone(), SkipReason::Current));
            continue;
        }
        if let RetryDecision::Exhausted { eligible_at } = retry.decide(failure, now) {
            skipped.push((locator.clone(), SkipReason::RetryExhausted { eligible_at }));
            continue;
        }
        process.push(Candidate {
            locator: locator.clone(),
            revision: revision.clone(),
            reason,
        });
    }

    RunPlan {
        diff,
        cleanup,
        reappeared,
        process,
        skipped,
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub manifest_entries: usize,
    pub added: usize,
    pub changed: usize,
    pub removed: usize,
    pub processed: usize,
    pub failed: usize,
    pub skipped_current: usize,
    pub skipped_retry: usize,
    pub cleanup_complete: usize,
    pub cleanup_partial: usize,
    pub cleanup_failed: usize,
    pub snapshot_committed: bool,
    pub duration_ms: u128,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Another run holds the lock; nothing was done.
    LockContended,
    Completed(RunSummary),
    /// Cancelled mid-run; the snapshot was not committed.
    Interrupted(RunSummary),
}

/// Run one reconciliation pass.
///
/// This is the canonical entrypoint for `docsync run`.
pub fn run(
    settings: &RunSettings,
    collaborators: Collaborators<'_>,
    cancel: &CancelFlag,
) -> Result<RunOutcome, SyncError> {
    let mut lock = RunLock::new(&settings.lock_path);
    if !lock.acquire()? {
        tracing::info!(path = %settings.lock_path.display(), "another run holds the lock");
        return Ok(RunOutcome::LockContended);
    }
    let result = reconcile(settings, collaborators, cancel);
    lock.release();
    result
}

fn reconcile(
    settings: &RunSettings,
    collaborators: Collaborators<'_>,
    cancel: &CancelFlag,
) -> Result<RunOutcome, SyncError> {
    let started = Instant::now();

    let manifest = collaborators.manifest.fetch().map_err(SyncError::Manifest)?;
    let committed = snapshot::load(&settings.state_dir);
    if manifest.is_empty() && !committed.is_empty() {
        if !settings.allow_empty_manifest {
            return Err(SyncError::EmptyManifest {
                previous: committed.len(),
            });
        }
        tracing::warn!(
            previous = committed.len(),
            "manifest is empty; removing every previously listed document"
        );
    }

    let mut store = StateStore::open(&settings.state_dir);
    let plan = plan(&committed, &manifest, &store, &settings.retry, Utc::now());
    tracing::info!(
        entries = manifest.len(),
        added = plan.diff.added.len(),
        changed = plan.diff.changed.len(),
        removed = plan.diff.removed.len(),
        to_process = plan.process.len(),
        to_clean = plan.cleanup.len(),
        "manifest reconciled",
    );

    let mut summary = RunSummary {
        manifest_entries: manifest.len(),
        added: plan.diff.added.len(),
        changed: plan.diff.changed.len(),
        removed: plan.diff.removed.len(),
        ..RunSummary::default()
    };
    for (locator, reason) in &plan.skipped {
        match reason {
            SkipReason::Current => summary.skipped_current += 1,
            SkipReason::RetryExhausted { eligible_at } => {
                tracing::info!(locator = %locator, %eligible_at, "retry cap reached; skipping");
                summary.skipped_retry += 1;
            }
        }
    }

    for locator in &plan.reappeared {
        tracing::info!(locator = %locator, "locator reappeared; dropping queued cleanup");
        store.dequeue_cleanup(locator)?;
    }

    let saga = CleanupSaga {
        mirror: collaborators.item.mirror,
        knowledge_base: collaborators.item.knowledge_base,
        artifacts_dir: settings.item.artifacts_dir.clone(),
    };
    for locator in &plan.cleanup {
        if cancel.is_cancelled() {
            return Ok(interrupted(summary, started));
        }
        match saga.run(&mut store, locator)?.status {
            CleanupStatus::Complete => summary.cleanup_complete += 1,
            CleanupStatus::Partial => summary.cleanup_partial += 1,
            CleanupStatus::Failed => summary.cleanup_failed += 1,
        }
    }

    let items = ItemPipeline::new(collaborators.item, &settings.item, cancel);
    for (index, candidate) in plan.process.iter().enumerate() {
        if index > 0 && !cancel.sleep(settings.item_delay) {
            return Ok(interrupted(summary, started));
        }
        if cancel.is_cancelled() {
            return Ok(interrupted(summary, started));
        }
        match items.process(&mut store, &candidate.locator, &candidate.revision)? {
            ItemOutcome::Done => summary.processed += 1,
            ItemOutcome::Failed { .. } => summary.failed += 1,
            ItemOutcome::Interrupted { .. } => return Ok(interrupted(summary, started)),
        }
    }

    snapshot::commit(&settings.state_dir, &manifest)?;
    summary.snapshot_committed = true;
    summary.duration_ms = started.elapsed().as_millis();
    tracing::info!(
        processed = summary.processed,
        failed = summary.failed,
        duration_ms = summary.duration_ms,
        "run complete",
    );
    Ok(RunOutcome::Completed(summary))
}

fn interrupted(mut summary: RunSummary, started: Instant) -> RunOutcome {
    summary.duration_ms = started.elapsed().as_millis();
    tracing::warn!("run interrupted; manifest snapshot not committed");
    RunOutcome::Interrupted(summary)
}
