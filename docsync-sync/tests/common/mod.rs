#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use docsync_core::{
    Converter, DocumentFetcher, KbSource, KnowledgeBase, Locator, Manifest, ManifestSource,
    Mirror, RemoteError,
};
use docsync_sync::{Collaborators, ItemCollaborators, ItemSettings, RetryPolicy, RunSettings};
use tempfile::TempDir;

pub const LONG_TEXT: &str = "Le présent guide décrit les démarches à suivre pour la demande.";

pub fn loc(s: &str) -> Locator {
    Locator::from(s)
}

pub fn manifest(entries: &[(&str, &str)]) -> Manifest {
    entries
        .iter()
        .map(|(l, r)| (Locator::from(*l), r.to_string()))
        .collect()
}

pub fn settings(home: &TempDir) -> RunSettings {
    let root = home.path().join(".docsync");
    RunSettings {
        state_dir: root.join("state"),
        lock_path: root.join("run").join("docsync.lock"),
        item_delay: Duration::ZERO,
        allow_empty_manifest: false,
        retry: RetryPolicy::default(),
        item: ItemSettings {
            scratch_dir: root.join("scratch"),
            artifacts_dir: root.join("artifacts"),
            min_document_bytes: 8,
            min_text_chars: 20,
            language: "fr".to_string(),
        },
    }
}

pub fn scratch_is_empty(settings: &RunSettings) -> bool {
    match std::fs::read_dir(&settings.item.scratch_dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeManifest {
    pub manifest: RefCell<Manifest>,
    pub fail: Cell<bool>,
}

impl FakeManifest {
    pub fn set(&self, manifest: Manifest) {
        *self.manifest.borrow_mut() = manifest;
    }
}

impl ManifestSource for FakeManifest {
    fn fetch(&self) -> Result<Manifest, RemoteError> {
        if self.fail.get() {
            return Err(RemoteError::Transport {
                url: "https://catalog.test/sitemap.xml".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(self.manifest.borrow().clone())
    }
}

/// Serves documents from a map; unknown locators answer 404.
#[derive(Default)]
pub struct FakeFetcher {
    pub documents: RefCell<BTreeMap<Locator, Vec<u8>>>,
    pub calls: Cell<usize>,
}

impl FakeFetcher {
    pub fn serve(&self, locator: &str, body: &str) {
        self.documents
            .borrow_mut()
            .insert(loc(locator), body.as_bytes().to_vec());
    }
}

impl DocumentFetcher for FakeFetcher {
    fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, RemoteError> {
        self.calls.set(self.calls.get() + 1);
        self.documents
            .borrow()
            .get(locator)
            .cloned()
            .ok_or_else(|| RemoteError::Status {
                url: locator.to_string(),
                status: 404,
            })
    }
}

/// "Converts" by returning the document bytes as text.
#[derive(Default)]
pub struct EchoConverter {
    pub seen: RefCell<Vec<PathBuf>>,
}

impl Converter for EchoConverter {
    fn convert(&self, document: &Path, _language: &str) -> Result<String, RemoteError> {
        self.seen.borrow_mut().push(document.to_path_buf());
        std::fs::read_to_string(document).map_err(|e| RemoteError::Io {
            path: document.to_path_buf(),
            source: e,
        })
    }
}

#[derive(Default)]
pub struct FakeMirror {
    pub objects: RefCell<BTreeMap<String, Vec<u8>>>,
    pub fail_put: Cell<bool>,
    pub fail_delete: Cell<bool>,
}

impl FakeMirror {
    fn unavailable(name: &str) -> RemoteError {
        RemoteError::Status {
            url: format!("mirror://{name}"),
            status: 503,
        }
    }
}

impl Mirror for FakeMirror {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), RemoteError> {
        if self.fail_put.get() {
            return Err(Self::unavailable(name));
        }
        self.objects
            .borrow_mut()
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), RemoteError> {
        if self.fail_delete.get() {
            return Err(Self::unavailable(name));
        }
        self.objects.borrow_mut().remove(name);
        Ok(())
    }

    fn list(&self) -> Result<BTreeSet<String>, RemoteError> {
        Ok(self.objects.borrow().keys().cloned().collect())
    }
}

#[derive(Debug, Clone)]
pub struct StoredSource {
    pub id: String,
    pub name: String,
    pub locator: Locator,
    pub content: String,
}

#[derive(Default)]
pub struct FakeKnowledgeBase {
    pub sources: RefCell<Vec<StoredSource>>,
    pub next_id: Cell<u32>,
    pub fail_create: Cell<bool>,
    pub fail_list: Cell<bool>,
}

impl FakeKnowledgeBase {
    pub fn named(&self, name: &str) -> Vec<StoredSource> {
        self.sources
            .borrow()
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    fn error() -> RemoteError {
        RemoteError::Status {
            url: "https://kb.test/sources".to_string(),
            status: 500,
        }
    }
}

impl KnowledgeBase for FakeKnowledgeBase {
    fn list_sources(&self) -> Result<Vec<KbSource>, RemoteError> {
        if self.fail_list.get() {
            return Err(Self::error());
        }
        Ok(self
            .sources
            .borrow()
            .iter()
            .map(|s| KbSource {
                id: s.id.clone(),
                name: s.name.clone(),
            })
            .collect())
    }

    fn create_source(
        &self,
        locator: &Locator,
        name: &str,
        content: &str,
    ) -> Result<(), RemoteError> {
        if self.fail_create.get() {
            return Err(Self::error());
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.sources.borrow_mut().push(StoredSource {
            id: format!("src-{id}"),
            name: name.to_string(),
            locator: locator.clone(),
            content: content.to_string(),
        });
        Ok(())
    }

    fn delete_source(&self, id: &str) -> Result<(), RemoteError> {
        self.sources.borrow_mut().retain(|s| s.id != id);
        Ok(())
    }
}

/// Bundle of fakes wired into the engine's collaborator structs.
#[derive(Default)]
pub struct World {
    pub manifest: FakeManifest,
    pub fetcher: FakeFetcher,
    pub converter: EchoConverter,
    pub mirror: FakeMirror,
    pub kb: FakeKnowledgeBase,
}

impl World {
    pub fn item(&self) -> ItemCollaborators<'_> {
        ItemCollaborators {
            fetcher: &self.fetcher,
            converter: &self.converter,
            mirror: &self.mirror,
            knowledge_base: &self.kb,
        }
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            manifest: &self.manifest,
            item: self.item(),
        }
    }
}
