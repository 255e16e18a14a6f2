//! Error types for docsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use docsync_core::RemoteError;

/// Run-level errors. Any of these aborts the run before the snapshot is
/// committed; per-item failures are [`ItemError`] instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error while persisting bookkeeping.
    #[error("state JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The manifest could not be fetched or parsed.
    #[error("failed to fetch manifest: {0}")]
    Manifest(#[source] RemoteError),

    /// The manifest came back empty although the last committed one was not.
    #[error("manifest is empty but the last committed manifest listed {previous} entries")]
    EmptyManifest { previous: usize },
}

/// Why a single item did not reach `Done`. The display form is what the
/// state store keeps as `last_error`.
#[derive(Debug, Error)]
pub enum ItemError {
    /// Network failure, timeout or non-success status while downloading.
    #[error("transport: {0}")]
    Transport(String),

    /// Download or extracted text unusable (empty, too small, engine failure).
    #[error("content: {0}")]
    Content(String),

    /// Local artifact, mirror or knowledge-base write failed.
    #[error("publish: {0}")]
    Publish(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
