//! Core types and collaborator traits for docsync.
//!
//! - [`types`]: manifest entries, tracked item records, removal audit records
//! - [`remote`]: traits for the external systems a run talks to
//! - [`config`]: YAML configuration under `~/.docsync/config.yaml`
//! - [`paths`]: storage layout helpers
//! - [`error`]: [`ConfigError`], [`RemoteError`]

pub mod config;
pub mod error;
pub mod paths;
pub mod remote;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, RemoteError};
pub use remote::{
    Converter, DocumentFetcher, KbSource, KnowledgeBase, ManifestSource, Mirror, SuspendHook,
};
pub use types::{
    manifest_from_entries, CleanupStep, FailedRecord, Locator, Manifest, ManifestEntry,
    ProcessedRecord, RemovalRecord, TrackedItem,
};
