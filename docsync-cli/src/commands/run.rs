//! `docsync run`: one reconciliation pass.
//!
//! The orchestrator is blocking, so it runs on a `spawn_blocking` task while
//! the runtime watches for SIGINT and SIGTERM. The first signal raises the
//! cancellation flag and the run stops after its current step; a second one
//! abandons the step and exits without waiting for it.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use docsync_connectors::Connectors;
use docsync_core::{paths, Mirror, SuspendHook};
use docsync_sync::{pipeline, CancelFlag, RunOutcome, RunSettings, RunSummary, SyncError};
#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

use crate::{log_rotation, logging};

/// `EX_TEMPFAIL`: another run holds the lock.
pub const EXIT_LOCKED: u8 = 75;
/// Conventional status for termination by a signal.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Object name of the uploaded run log on the mirror.
const LOG_OBJECT: &str = "docsync.log";

/// Arguments for `docsync run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Do not run the configured suspend command at the end of the run.
    #[arg(long)]
    pub no_suspend: bool,

    /// Accept an empty manifest even when the last one listed documents,
    /// removing everything that was published.
    #[arg(long)]
    pub allow_empty: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<ExitCode> {
        let home = super::home()?;
        let config = super::load_config(&home)?;

        log_rotation::rotate_run_log(&home);
        let log_path = paths::run_log_path(&home);
        logging::init(Some(&log_path))?;

        let mut settings = RunSettings::from_config(&home, &config);
        settings.allow_empty_manifest |= self.allow_empty;
        let connectors = Arc::new(docsync_connectors::from_config(&config));
        let mut finalizer = Finalizer {
            connectors: Arc::clone(&connectors),
            log_path,
            upload_log: config.upload_log,
            suspend: !self.no_suspend,
            armed: true,
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        tracing::info!(manifest = %config.manifest_url, "run starting");
        let ended = runtime.block_on(drive(settings, connectors, CancelFlag::new()));
        // An abandoned worker may still be blocked in a step; do not wait for it.
        runtime.shutdown_background();

        let outcome = match ended? {
            Ended::Finished(outcome) => outcome,
            Ended::Abandoned => {
                eprintln!(
                    "{} second interrupt; current step abandoned",
                    "aborted:".red().bold()
                );
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
        };
        match outcome {
            RunOutcome::LockContended => {
                finalizer.armed = false;
                eprintln!("{} another docsync run is in progress", "locked:".yellow().bold());
                Ok(ExitCode::from(EXIT_LOCKED))
            }
            RunOutcome::Completed(summary) => {
                print_summary("done", &summary);
                Ok(ExitCode::SUCCESS)
            }
            RunOutcome::Interrupted(summary) => {
                print_summary("interrupted", &summary);
                Ok(ExitCode::from(EXIT_INTERRUPTED))
            }
        }
    }
}

/// How the driven run ended.
enum Ended {
    Finished(RunOutcome),
    /// A second interrupt arrived before the worker stopped.
    Abandoned,
}

async fn drive(
    settings: RunSettings,
    connectors: Arc<Connectors>,
    cancel: CancelFlag,
) -> Result<Ended> {
    let mut signals = Interrupts::register().context("failed to install signal handlers")?;
    let worker = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            pipeline::run(&settings, super::collaborators(&connectors), &cancel)
        })
    };
    tokio::pin!(worker);

    tokio::select! {
        joined = &mut worker => {
            return finished(joined).map(Ended::Finished);
        }
        received = signals.recv() => {
            tracing::warn!(
                signal = received,
                "interrupt received; stopping after the current step"
            );
            cancel.cancel();
        }
    }

    tokio::select! {
        joined = &mut worker => finished(joined).map(Ended::Finished),
        received = signals.recv() => {
            tracing::error!(
                signal = received,
                "second interrupt; abandoning the current step"
            );
            Ok(Ended::Abandoned)
        }
    }
}

fn finished(
    joined: Result<Result<RunOutcome, SyncError>, tokio::task::JoinError>,
) -> Result<RunOutcome> {
    joined.context("run task panicked")?.context("run failed")
}

/// SIGINT and SIGTERM, registered once for the whole run so a signal
/// arriving between two waits is not lost.
#[cfg(unix)]
struct Interrupts {
    interrupt: Signal,
    terminate: Signal,
}

#[cfg(unix)]
impl Interrupts {
    fn register() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

#[cfg(not(unix))]
struct Interrupts;

#[cfg(not(unix))]
impl Interrupts {
    fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        "ctrl-c"
    }
}

fn print_summary(label: &str, summary: &RunSummary) {
    let label = if summary.snapshot_committed {
        label.green().bold()
    } else {
        label.yellow().bold()
    };
    println!(
        "{label} {} entries | +{} ~{} -{} | {} processed, {} failed, {} current, {} held back | cleanup {}/{}/{} | {} ms",
        summary.manifest_entries,
        summary.added,
        summary.changed,
        summary.removed,
        summary.processed,
        summary.failed,
        summary.skipped_current,
        summary.skipped_retry,
        summary.cleanup_complete,
        summary.cleanup_partial,
        summary.cleanup_failed,
        summary.duration_ms,
    );
}

// ---------------------------------------------------------------------------
// End-of-run finalizer
// ---------------------------------------------------------------------------

/// Runs on every exit path once the lock is released: optional log upload,
/// then the optional suspend command. Disarmed on lock contention.
struct Finalizer {
    connectors: Arc<Connectors>,
    log_path: PathBuf,
    upload_log: bool,
    suspend: bool,
    armed: bool,
}

impl Finalizer {
    fn upload_log(&self) {
        let bytes = match std::fs::read(&self.log_path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %self.log_path.display(), error = %err, "run log unreadable; not uploaded");
                return;
            }
        };
        match self.connectors.mirror.put(LOG_OBJECT, &bytes) {
            Ok(()) => tracing::info!(bytes = bytes.len(), "run log uploaded"),
            Err(err) => tracing::warn!(error = %err, "run log upload failed"),
        }
    }
}

impl Drop for Finalizer {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.upload_log {
            self.upload_log();
        }
        if !self.suspend {
            return;
        }
        if let Some(hook) = &self.connectors.suspend {
            if let Err(err) = hook.suspend() {
                tracing::warn!(error = %err, "suspend command failed");
            }
        }
    }
}
