//! Storage layout under `<home>/.docsync/`.
//!
//! ```text
//! ~/.docsync/
//!   config.yaml
//!   state/      manifest.json, processed.json, failed.json,
//!               pending_cleanup.json, removals.jsonl
//!   artifacts/  converted markdown
//!   scratch/    per-item downloads
//!   run/        docsync.lock
//!   logs/       docsync.log (+ rotated copies)
//! ```

use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.yaml";
pub const LOCK_FILE: &str = "docsync.lock";
pub const RUN_LOG: &str = "docsync.log";

pub fn docsync_root(home: &Path) -> PathBuf {
    home.join(".docsync")
}

pub fn config_path(home: &Path) -> PathBuf {
    docsync_root(home).join(CONFIG_FILE)
}

pub fn state_dir(home: &Path) -> PathBuf {
    docsync_root(home).join("state")
}

pub fn artifacts_dir(home: &Path) -> PathBuf {
    docsync_root(home).join("artifacts")
}

pub fn scratch_dir(home: &Path) -> PathBuf {
    docsync_root(home).join("scratch")
}

pub fn run_dir(home: &Path) -> PathBuf {
    docsync_root(home).join("run")
}

pub fn lock_path(home: &Path) -> PathBuf {
    run_dir(home).join(LOCK_FILE)
}

pub fn logs_dir(home: &Path) -> PathBuf {
    docsync_root(home).join("logs")
}

pub fn run_log_path(home: &Path) -> PathBuf {
    logs_dir(home).join(RUN_LOG)
}
