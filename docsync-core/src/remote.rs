//! Boundary traits for the external systems a run talks to.
//!
//! The sync engine only sees these traits; `docsync-connectors` provides the
//! HTTP, filesystem and command-line implementations. All calls are blocking
//! and each implementation bounds its own network waits with a timeout.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::RemoteError;
use crate::types::{Locator, Manifest};

/// Fetches and parses the current manifest.
pub trait ManifestSource {
    fn fetch(&self) -> Result<Manifest, RemoteError>;
}

/// Downloads the raw document behind a locator.
pub trait DocumentFetcher {
    fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, RemoteError>;
}

/// Document-to-text conversion engine.
pub trait Converter {
    /// Convert the document stored at `document` into text. `language` is a
    /// hint for the engine's OCR / layout models.
    fn convert(&self, document: &Path, language: &str) -> Result<String, RemoteError>;
}

/// Object mirror holding converted artifacts.
pub trait Mirror {
    /// Store `bytes` under `name`, replacing any prior object.
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), RemoteError>;

    /// Remove `name`. Removing an absent object succeeds.
    fn delete(&self, name: &str) -> Result<(), RemoteError>;

    fn list(&self) -> Result<BTreeSet<String>, RemoteError>;
}

/// A source registered in the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KbSource {
    pub id: String,
    pub name: String,
}

/// Searchable knowledge-base registry.
pub trait KnowledgeBase {
    fn list_sources(&self) -> Result<Vec<KbSource>, RemoteError>;

    /// Register `content` under `name`, attributing it to `locator`.
    fn create_source(&self, locator: &Locator, name: &str, content: &str)
        -> Result<(), RemoteError>;

    /// Delete a source by id. Deleting an unknown id succeeds.
    fn delete_source(&self, id: &str) -> Result<(), RemoteError>;
}

/// Host suspension / shutdown, invoked once at the end of a run.
pub trait SuspendHook {
    fn suspend(&self) -> Result<(), RemoteError>;
}
