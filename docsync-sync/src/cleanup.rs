//! Cleanup saga for a locator that left the manifest.
//!
//! Four independent, idempotent sub-steps, always all attempted:
//!
//! 1. delete the knowledge-base source (absent is success)
//! 2. delete the local converted artifact (absent is success)
//! 3. delete the mirrored artifact (absent is success)
//! 4. clear the state store record
//!
//! A [`RemovalRecord`] is appended whatever the outcome. Anything short of
//! complete keeps the locator in the pending cleanup queue so later runs
//! retry it even though no diff will report it again. Failing to write the
//! audit line or the queue is an error of the saga itself: the caller must
//! not commit a snapshot that forgets the locator.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use docsync_core::{CleanupStep, KnowledgeBase, Locator, Mirror, RemovalRecord};

use crate::artifact;
use crate::error::SyncError;
use crate::state_store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStatus {
    /// Every sub-step succeeded.
    Complete,
    /// Some sub-steps succeeded.
    Partial,
    /// No sub-step succeeded.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub locator: Locator,
    pub steps: BTreeMap<CleanupStep, bool>,
    pub status: CleanupStatus,
}

pub struct CleanupSaga<'a> {
    pub mirror: &'a dyn Mirror,
    pub knowledge_base: &'a dyn KnowledgeBase,
    pub artifacts_dir: PathBuf,
}

impl CleanupSaga<'_> {
    pub fn run(
        &self,
        store: &mut StateStore,
        locator: &Locator,
    ) -> Result<CleanupReport, SyncError> {
        let name = artifact::artifact_name(locator);
        let local = artifact::artifact_path(&self.artifacts_dir, locator);
        let mut steps = BTreeMap::new();

        for step in CleanupStep::all() {
            let result = match step {
                CleanupStep::KnowledgeBase => self.delete_kb_sources(&name),
                CleanupStep::LocalArtifact => artifact::remove_if_exists(&local)
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                CleanupStep::Mirror => self.mirror.delete(&name).map_err(|e| e.to_string()),
                CleanupStep::StateRecord => store.clear(locator).map_err(|e| e.to_string()),
            };
            if let Err(error) = &result {
                tracing::warn!(locator = %locator, step = %step, error = %error, "cleanup step failed");
            }
            steps.insert(*step, result.is_ok());
        }

        let succeeded = steps.values().filter(|ok| **ok).count();
        let status = if succeeded == steps.len() {
            CleanupStatus::Complete
        } else if succeeded > 0 {
            CleanupStatus::Partial
        } else {
            CleanupStatus::Failed
        };

        let record = RemovalRecord {
            locator: locator.clone(),
            removed_at: Utc::now(),
            cleanup: steps.clone(),
        };
        store.record_removal(&record)?;
        match status {
            CleanupStatus::Complete => store.dequeue_cleanup(locator)?,
            CleanupStatus::Partial | CleanupStatus::Failed => store.queue_cleanup(locator)?,
        }

        tracing::info!(locator = %locator, status = ?status, "cleanup finished");
        Ok(CleanupReport {
            locator: locator.clone(),
            steps,
            status,
        })
    }

    fn delete_kb_sources(&self, name: &str) -> Result<(), String> {
        let sources = self
            .knowledge_base
            .list_sources()
            .map_err(|e| e.to_string())?;
        for source in sources.into_iter().filter(|s| s.name == name) {
            self.knowledge_base
                .delete_source(&source.id)
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}
