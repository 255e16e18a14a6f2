//! Size-based rotation of the run log.
//!
//! `docsync.log` is rotated before a run once it exceeds 10 MiB, keeping at
//! most five copies: `docsync.log` → `docsync.log.1` → … → `docsync.log.5`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use docsync_core::paths;

pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

pub const MAX_ROTATED_FILES: usize = 5;

/// Rotate `log_path` if it is at least `max_bytes` long. Returns `true` when
/// a rotation happened. A missing log is not an error.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64, max_files: usize) -> io::Result<bool> {
    if !is_oversized(log_path, max_bytes)? {
        return Ok(false);
    }
    let backups = Backups {
        base: log_path,
        keep: max_files,
    };
    backups.age()?;
    fs::rename(log_path, backups.slot(1))?;
    Ok(true)
}

fn is_oversized(path: &Path, max_bytes: u64) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len() >= max_bytes),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Numbered copies of one log; slot 1 is the newest.
struct Backups<'a> {
    base: &'a Path,
    keep: usize,
}

impl Backups<'_> {
    fn slot(&self, n: usize) -> PathBuf {
        numbered_path(self.base, n)
    }

    /// Move every copy one slot older, dropping the one in the last slot.
    fn age(&self) -> io::Result<()> {
        ignore_missing(fs::remove_file(self.slot(self.keep)))?;
        (1..self.keep)
            .rev()
            .try_for_each(|n| ignore_missing(fs::rename(self.slot(n), self.slot(n + 1))))
    }
}

fn ignore_missing(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Rotate the run log under `home`. Runs before logging is installed, so a
/// failure is reported on stderr and otherwise ignored.
pub fn rotate_run_log(home: &Path) {
    let log_path = paths::run_log_path(home);
    if let Err(err) = rotate_if_needed(&log_path, MAX_LOG_BYTES, MAX_ROTATED_FILES) {
        eprintln!("warning: rotating {} failed: {err}", log_path.display());
    }
}

fn numbered_path(base: &Path, n: usize) -> PathBuf {
    let name = base
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(paths::RUN_LOG);
    base.with_file_name(format!("{name}.{n}"))
}
