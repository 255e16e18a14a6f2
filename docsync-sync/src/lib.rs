//! # docsync-sync
//!
//! Incremental synchronization and recovery engine.
//!
//! Call [`pipeline::run`] for one reconciliation pass, or [`pipeline::plan`]
//! to see what a pass would do without touching anything.

pub mod artifact;
pub mod cancel;
pub mod cleanup;
pub mod diff;
pub mod error;
pub mod item;
pub mod lock;
mod persist;
pub mod pipeline;
pub mod retry;
pub mod snapshot;
pub mod state_store;

pub use cancel::CancelFlag;
pub use cleanup::{CleanupReport, CleanupSaga, CleanupStatus};
pub use diff::{diff, ManifestDiff};
pub use error::{ItemError, SyncError};
pub use item::{ItemCollaborators, ItemOutcome, ItemPipeline, ItemSettings, ItemStage};
pub use lock::RunLock;
pub use pipeline::{Collaborators, RunOutcome, RunPlan, RunSettings, RunSummary};
pub use retry::{RetryDecision, RetryPolicy};
pub use state_store::StateStore;
