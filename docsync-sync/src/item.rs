//! Item pipeline: drives one locator through
//! `Pending → Downloading → Converting → Publishing → {Done, Failed}`.
//!
//! Failures are recorded with [`StateStore::mark_failed`] and returned as an
//! outcome; only bookkeeping I/O errors escape as [`SyncError`]. A partially
//! published item is left as-is, the next attempt overwrites it.

use std::io::Write;
use std::path::PathBuf;

use docsync_core::{Converter, DocumentFetcher, KnowledgeBase, Locator, Mirror};

use crate::artifact;
use crate::cancel::CancelFlag;
use crate::error::{ItemError, SyncError};
use crate::state_store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStage {
    Pending,
    Downloading,
    Converting,
    Publishing,
    Done,
    Failed,
}

#[derive(Debug)]
pub enum ItemOutcome {
    Done,
    Failed {
        stage: ItemStage,
        error: ItemError,
        retry_count: u32,
    },
    /// Cancelled before reaching a terminal state; nothing was recorded.
    Interrupted { stage: ItemStage },
}

/// Tunables for a single item.
#[derive(Debug, Clone)]
pub struct ItemSettings {
    pub scratch_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub min_document_bytes: usize,
    pub min_text_chars: usize,
    pub language: String,
}

/// The external systems an item touches.
#[derive(Clone, Copy)]
pub struct ItemCollaborators<'a> {
    pub fetcher: &'a dyn DocumentFetcher,
    pub converter: &'a dyn Converter,
    pub mirror: &'a dyn Mirror,
    pub knowledge_base: &'a dyn KnowledgeBase,
}

enum Halt {
    Failed(ItemStage, ItemError),
    Interrupted(ItemStage),
}

pub struct ItemPipeline<'a> {
    collaborators: ItemCollaborators<'a>,
    settings: &'a ItemSettings,
    cancel: &'a CancelFlag,
}

impl<'a> ItemPipeline<'a> {
    pub fn new(
        collaborators: ItemCollaborators<'a>,
        settings: &'a ItemSettings,
        cancel: &'a CancelFlag,
    ) -> Self {
        Self {
            collaborators,
            settings,
            cancel,
        }
    }

    /// Run one item to a terminal state and record the outcome.
    pub fn process(
        &self,
        store: &mut StateStore,
        locator: &Locator,
        revision: &str,
    ) -> Result<ItemOutcome, SyncError> {
        tracing::info!(locator = %locator, revision, "processing item");
        match self.drive(locator) {
            Ok(()) => {
                store.mark_processed(locator, revision)?;
                tracing::info!(locator = %locator, stage = ?ItemStage::Done, "item done");
                Ok(ItemOutcome::Done)
            }
            Err(Halt::Interrupted(stage)) => {
                tracing::warn!(locator = %locator, stage = ?stage, "item interrupted");
                Ok(ItemOutcome::Interrupted { stage })
            }
            Err(Halt::Failed(stage, error)) => {
                let retry_count = store.mark_failed(locator, &error.to_string())?;
                tracing::error!(
                    locator = %locator,
                    stage = ?stage,
                    retry_count,
                    error = %error,
                    "item failed",
                );
                Ok(ItemOutcome::Failed {
                    stage,
                    error,
                    retry_count,
                })
            }
        }
    }

    fn drive(&self, locator: &Locator) -> Result<(), Halt> {
        let mut stage = ItemStage::Pending;

        self.enter(&mut stage, ItemStage::Downloading, locator)?;
        // Removed from disk when dropped, on every path out of this function.
        let scratch = self
            .download(locator)
            .map_err(|e| Halt::Failed(stage, e))?;

        self.enter(&mut stage, ItemStage::Converting, locator)?;
        let text = self
            .convert(scratch.path())
            .map_err(|e| Halt::Failed(stage, e))?;
        drop(scratch);

        self.enter(&mut stage, ItemStage::Publishing, locator)?;
        self.publish(locator, &text)
            .map_err(|e| Halt::Failed(stage, e))
    }

    fn enter(&self, stage: &mut ItemStage, next: ItemStage, locator: &Locator) -> Result<(), Halt> {
        if self.cancel.is_cancelled() {
            return Err(Halt::Interrupted(*stage));
        }
        tracing::debug!(locator = %locator, from = ?*stage, to = ?next, "item stage");
        *stage = next;
        Ok(())
    }

    fn download(&self, locator: &Locator) -> Result<tempfile::NamedTempFile, ItemError> {
        let bytes = self
            .collaborators
            .fetcher
            .fetch(locator)
            .map_err(|e| ItemError::Transport(e.to_string()))?;
        if bytes.len() < self.settings.min_document_bytes {
            return Err(ItemError::Content(format!(
                "download is {} bytes, below the {}-byte floor",
                bytes.len(),
                self.settings.min_document_bytes
            )));
        }

        let suffix = artifact::source_extension(locator)
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let stage_err = |e: std::io::Error| {
            ItemError::Transport(format!(
                "cannot stage download in {}: {e}",
                self.settings.scratch_dir.display()
            ))
        };
        std::fs::create_dir_all(&self.settings.scratch_dir).map_err(stage_err)?;
        let mut scratch = tempfile::Builder::new()
            .prefix("docsync-")
            .suffix(&suffix)
            .tempfile_in(&self.settings.scratch_dir)
            .map_err(stage_err)?;
        scratch.write_all(&bytes).map_err(stage_err)?;
        scratch.flush().map_err(stage_err)?;
        tracing::info!(locator = %locator, bytes = bytes.len(), "downloaded");
        Ok(scratch)
    }

    fn convert(&self, document: &std::path::Path) -> Result<String, ItemError> {
        let text = self
            .collaborators
            .converter
            .convert(document, &self.settings.language)
            .map_err(|e| ItemError::Content(format!("conversion failed: {e}")))?;
        let chars = text.trim().chars().count();
        if chars < self.settings.min_text_chars {
            return Err(ItemError::Content(format!(
                "extracted {chars} characters, minimum is {}",
                self.settings.min_text_chars
            )));
        }
        Ok(text)
    }

    fn publish(&self, locator: &Locator, text: &str) -> Result<(), ItemError> {
        let name = artifact::artifact_name(locator);
        let content = artifact::with_footer(text, locator);

        let local = artifact::artifact_path(&self.settings.artifacts_dir, locator);
        artifact::write_atomic(&local, &content)
            .map_err(|e| ItemError::Publish(format!("local artifact: {e}")))?;

        self.collaborators
            .mirror
            .put(&name, content.as_bytes())
            .map_err(|e| ItemError::Publish(format!("mirror: {e}")))?;
        tracing::info!(locator = %locator, name = %name, "mirrored");

        self.upsert_knowledge_base(locator, &name, &content)
            .map_err(|e| ItemError::Publish(format!("knowledge base: {e}")))?;
        tracing::info!(locator = %locator, name = %name, "knowledge base updated");
        Ok(())
    }

    // The knowledge base has no atomic replace: delete every source with our
    // name, then create. A failed create leaves no entry until the retry.
    fn upsert_knowledge_base(
        &self,
        locator: &Locator,
        name: &str,
        content: &str,
    ) -> Result<(), docsync_core::RemoteError> {
        let kb = self.collaborators.knowledge_base;
        for source in kb.list_sources()?.into_iter().filter(|s| s.name == name) {
            kb.delete_source(&source.id)?;
        }
        kb.create_source(locator, name, content)
    }
}
