//! docsync: incremental document-catalog sync.
//!
//! # Usage
//!
//! ```text
//! docsync run [--no-suspend]
//! docsync diff [--json]
//! docsync status [--json]
//! ```
//!
//! Exit status: 0 on success, 1 on a run-level error, 75 when another run
//! holds the lock, 130 when interrupted.

mod commands;
mod logging;
mod log_rotation;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, run::RunArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "docsync",
    version,
    about = "Mirror a document catalog into a knowledge base, incrementally",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one reconciliation pass against the catalog manifest.
    Run(RunArgs),

    /// Show what a run would do, without touching any state.
    Diff(DiffArgs),

    /// Show bookkeeping: processed, failed and pending-cleanup items.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result: Result<ExitCode> = match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Diff(args) => args.run().map(|()| ExitCode::SUCCESS),
        Commands::Status(args) => args.run().map(|()| ExitCode::SUCCESS),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
