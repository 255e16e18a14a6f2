//! Single-instance execution lock.
//!
//! Arbitration is an OS advisory `flock(LOCK_EX | LOCK_NB)` on a well-known
//! file, so the kernel drops the lock when the holder exits, cleanly or not.
//! The lock file is never deleted. While held it carries the holder's pid;
//! a clean release empties it.
//!
//! Observers ([`is_locked`]) never touch the flock: taking it, even briefly,
//! would make a run starting at the same instant see contention and skip
//! its pass. They read the recorded pid and check that the process is
//! alive instead, which can report a crashed holder whose pid was reused as
//! still running.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{io_err, SyncError};

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    file: Option<File>,
}

impl RunLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Try to take the lock without blocking. Returns `Ok(false)` when
    /// another live process (or another handle) holds it.
    pub fn acquire(&mut self) -> Result<bool, SyncError> {
        if self.file.is_some() {
            return Ok(true);
        }
        let mut file = open_lock_file(&self.path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if is_contended(&err) => return Ok(false),
            Err(err) => return Err(io_err(&self.path, err)),
        }

        // Record the owner only once the lock is ours.
        file.set_len(0).map_err(|e| io_err(&self.path, e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| io_err(&self.path, e))?;
        writeln!(file, "{}", std::process::id()).map_err(|e| io_err(&self.path, e))?;
        file.flush().map_err(|e| io_err(&self.path, e))?;

        self.file = Some(file);
        tracing::debug!(path = %self.path.display(), "run lock acquired");
        Ok(true)
    }

    /// Release the lock. No-op when not held.
    pub fn release(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        // Clear the pid while still holding the lock so observers see idle.
        if let Err(err) = file.set_len(0) {
            tracing::warn!(path = %self.path.display(), error = %err, "run lock pid not cleared");
        }
        if let Err(err) = FileExt::unlock(&file) {
            // Closing the descriptor below releases it anyway.
            tracing::warn!(path = %self.path.display(), error = %err, "run lock unlock failed");
        }
        drop(file);
        tracing::debug!(path = %self.path.display(), "run lock released");
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Whether a live process is recorded as holding the lock at `path`.
///
/// Reads the lock file only; the flock itself is left alone.
pub fn is_locked(path: &Path) -> Result<bool, SyncError> {
    match std::fs::metadata(path) {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(io_err(path, err)),
    }
    Ok(recorded_pid(path).is_some_and(is_pid_alive))
}

/// Pid recorded by the last holder, if readable.
pub fn recorded_pid(path: &Path) -> Option<u32> {
    let mut contents = String::new();
    File::open(path).ok()?.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

fn open_lock_file(path: &Path) -> Result<File, SyncError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| io_err(path, e))
}

/// `kill(pid, 0)` checks existence without delivering a signal. `EPERM`
/// means the process exists under another user.
#[cfg(unix)]
fn is_pid_alive(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 performs the permission and existence checks only.
    let result = unsafe { libc::kill(pid, 0) };
    result == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn is_pid_alive(pid: u32) -> bool {
    pid != 0
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
