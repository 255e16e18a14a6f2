//! `docsync status`: bookkeeping overview. Works without network access.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use docsync_core::{config, paths, ConfigError, FailedRecord, Locator};
use docsync_sync::{lock, snapshot, RetryDecision, RetryPolicy, StateStore};

use super::diff::format_time;

/// Arguments for `docsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusReport {
    manifest_entries: usize,
    processed: usize,
    failed: Vec<FailedItem>,
    pending_cleanup: Vec<PendingCleanup>,
    lock: LockStatus,
}

#[derive(Serialize)]
struct FailedItem {
    locator: Locator,
    retry_count: u32,
    last_error: String,
    failed_at: DateTime<Utc>,
    /// `None` means the next run will attempt it.
    eligible_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct PendingCleanup {
    locator: Locator,
    queued_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct LockStatus {
    held: bool,
    pid: Option<u32>,
}

#[derive(Tabled)]
struct FailedRow {
    #[tabled(rename = "locator")]
    locator: String,
    #[tabled(rename = "attempts")]
    attempts: u32,
    #[tabled(rename = "next attempt")]
    next_attempt: String,
    #[tabled(rename = "last error")]
    last_error: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let retry = retry_policy(&home)?;
        let report = build_report(&home, &retry, Utc::now())?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_report(&report);
        Ok(())
    }
}

/// Retry settings from the config file, or the defaults when there is none.
fn retry_policy(home: &Path) -> Result<RetryPolicy> {
    match config::load_at(home) {
        Ok(config) => Ok(RetryPolicy::from(&config.retry)),
        Err(ConfigError::NotFound { .. }) => Ok(RetryPolicy::default()),
        Err(err) => Err(err).context("failed to load configuration"),
    }
}

fn build_report(home: &Path, retry: &RetryPolicy, now: DateTime<Utc>) -> Result<StatusReport> {
    let state_dir = paths::state_dir(home);
    let store = StateStore::open(&state_dir);
    let lock_path = paths::lock_path(home);
    let held = lock::is_locked(&lock_path).context("failed to read the run lock")?;

    Ok(StatusReport {
        manifest_entries: snapshot::load(&state_dir).len(),
        processed: store.processed().len(),
        failed: store
            .failed()
            .iter()
            .map(|(locator, record)| failed_item(locator, record, retry, now))
            .collect(),
        pending_cleanup: store
            .pending_cleanup()
            .iter()
            .map(|(locator, queued_at)| PendingCleanup {
                locator: locator.clone(),
                queued_at: *queued_at,
            })
            .collect(),
        lock: LockStatus {
            held,
            pid: if held { lock::recorded_pid(&lock_path) } else { None },
        },
    })
}

fn failed_item(
    locator: &Locator,
    record: &FailedRecord,
    retry: &RetryPolicy,
    now: DateTime<Utc>,
) -> FailedItem {
    let eligible_at = match retry.decide(Some(record), now) {
        RetryDecision::Exhausted { eligible_at } => Some(eligible_at),
        _ => None,
    };
    FailedItem {
        locator: locator.clone(),
        retry_count: record.retry_count,
        last_error: record.last_error.clone(),
        failed_at: record.failed_at,
        eligible_at,
    }
}

fn print_report(report: &StatusReport) {
    println!(
        "docsync v{} | {} manifest entries | {} processed | {} failed | {} pending cleanup",
        env!("CARGO_PKG_VERSION"),
        report.manifest_entries,
        report.processed,
        report.failed.len(),
        report.pending_cleanup.len(),
    );
    match (report.lock.held, report.lock.pid) {
        (true, Some(pid)) => println!("{} run in progress (pid {pid})", "■".yellow().bold()),
        (true, None) => println!("{} run in progress", "■".yellow().bold()),
        (false, _) => println!("{} idle", "■".green().bold()),
    }

    if !report.failed.is_empty() {
        let rows: Vec<FailedRow> = report
            .failed
            .iter()
            .map(|item| FailedRow {
                locator: item.locator.to_string(),
                attempts: item.retry_count,
                next_attempt: item
                    .eligible_at
                    .map(format_time)
                    .unwrap_or_else(|| "next run".to_string()),
                last_error: truncate(&item.last_error, 60),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{}", "FAILED".bold());
        println!("{table}");
    }

    if !report.pending_cleanup.is_empty() {
        println!("{}", "PENDING CLEANUP".bold());
        for pending in &report.pending_cleanup {
            println!("  {} (since {})", pending.locator, format_time(pending.queued_at));
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn empty_home_reports_nothing() {
        let home = TempDir::new().unwrap();
        let report = build_report(home.path(), &RetryPolicy::default(), Utc::now()).unwrap();
        assert_eq!(report.processed, 0);
        assert!(report.failed.is_empty());
        assert!(!report.lock.held);
    }

    #[test]
    fn capped_failure_shows_eligibility() {
        let home = TempDir::new().unwrap();
        let mut store = StateStore::open(&paths::state_dir(home.path()));
        let locator = Locator::from("https://catalog.test/a.pdf");
        let failed_at = Utc::now() - Duration::days(1);
        for _ in 0..3 {
            store.mark_failed_at(&locator, "content: too short", failed_at).unwrap();
        }
        store.mark_failed(&Locator::from("b"), "transport: timeout").unwrap();

        let report = build_report(home.path(), &RetryPolicy::default(), Utc::now()).unwrap();
        assert_eq!(report.failed.len(), 2);
        let capped = report.failed.iter().find(|f| f.locator == locator).unwrap();
        assert_eq!(capped.retry_count, 3);
        assert_eq!(capped.eligible_at, Some(failed_at + Duration::days(7)));
        let fresh = report.failed.iter().find(|f| f.locator.as_str() == "b").unwrap();
        assert_eq!(fresh.eligible_at, None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("court", 10), "court");
        assert_eq!(truncate("échéance dépassée", 5), "éché…");
    }
}
