//! `docsync diff`: fetch the manifest and print the run plan. Read-only.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use docsync_core::{paths, Locator, ManifestSource};
use docsync_sync::{
    pipeline::{self, CandidateReason, SkipReason},
    snapshot, RetryPolicy, RunPlan, StateStore,
};

use crate::logging;

/// Arguments for `docsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct PlanJson<'a> {
    manifest_entries: usize,
    snapshot_entries: usize,
    added: Vec<&'a Locator>,
    changed: Vec<&'a Locator>,
    removed: Vec<&'a Locator>,
    process: &'a [pipeline::Candidate],
    cleanup: &'a [Locator],
    skipped: Vec<SkippedJson<'a>>,
}

#[derive(Serialize)]
struct SkippedJson<'a> {
    locator: &'a Locator,
    #[serde(flatten)]
    reason: &'a SkipReason,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let config = super::load_config(&home)?;
        logging::init(None)?;

        let connectors = docsync_connectors::from_config(&config);
        let manifest = connectors
            .manifest
            .fetch()
            .with_context(|| format!("failed to fetch manifest from {}", config.manifest_url))?;

        let state_dir = paths::state_dir(&home);
        let committed = snapshot::load(&state_dir);
        let store = StateStore::open(&state_dir);
        let retry = RetryPolicy::from(&config.retry);
        let plan = pipeline::plan(&committed, &manifest, &store, &retry, Utc::now());

        if self.json {
            let payload = PlanJson {
                manifest_entries: manifest.len(),
                snapshot_entries: committed.len(),
                added: plan.diff.added.iter().collect(),
                changed: plan.diff.changed.iter().collect(),
                removed: plan.diff.removed.iter().collect(),
                process: &plan.process,
                cleanup: &plan.cleanup,
                skipped: plan
                    .skipped
                    .iter()
                    .map(|(locator, reason)| SkippedJson { locator, reason })
                    .collect(),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize plan JSON")?
            );
            return Ok(());
        }

        println!(
            "manifest: {} entries (last committed: {})",
            manifest.len(),
            committed.len()
        );
        print_plan(&plan);
        Ok(())
    }
}

fn print_plan(plan: &RunPlan) {
    if plan.process.is_empty() && plan.cleanup.is_empty() && plan.skipped.is_empty() {
        println!("Nothing to do.");
        return;
    }

    for locator in &plan.cleanup {
        println!("{} {locator}", "-".red().bold());
    }
    for candidate in &plan.process {
        let marker = match candidate.reason {
            CandidateReason::Added => "+".green().bold(),
            CandidateReason::Changed => "~".yellow().bold(),
            CandidateReason::RetryFailed => "!".magenta().bold(),
        };
        println!("{marker} {} @ {}", candidate.locator, display_revision(&candidate.revision));
    }
    for (locator, reason) in &plan.skipped {
        let detail = match reason {
            SkipReason::Current => "already processed at this revision".to_string(),
            SkipReason::RetryExhausted { eligible_at } => {
                format!("retry cap reached; eligible {}", format_time(*eligible_at))
            }
        };
        println!("{} {locator} ({detail})", "=".bright_black());
    }
    println!(
        "{} to process, {} to clean up, {} skipped",
        plan.process.len(),
        plan.cleanup.len(),
        plan.skipped.len()
    );
}

fn display_revision(revision: &str) -> &str {
    if revision.is_empty() {
        "(no revision)"
    } else {
        revision
    }
}

pub(crate) fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}
