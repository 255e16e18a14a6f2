//! Last committed manifest snapshot, stored as `<state_dir>/manifest.json`.
//!
//! Only the orchestrator writes it, once per completed run.

use std::path::{Path, PathBuf};

use docsync_core::Manifest;

use crate::error::SyncError;
use crate::persist::{load_or_default, save_atomic};

pub const SNAPSHOT_FILE: &str = "manifest.json";

pub fn snapshot_path(state_dir: &Path) -> PathBuf {
    state_dir.join(SNAPSHOT_FILE)
}

/// Load the committed manifest; empty on first run or corruption.
pub fn load(state_dir: &Path) -> Manifest {
    load_or_default(&snapshot_path(state_dir))
}

pub fn commit(state_dir: &Path, manifest: &Manifest) -> Result<(), SyncError> {
    save_atomic(&snapshot_path(state_dir), manifest)
}
