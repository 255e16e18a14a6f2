//! Domain types shared by the sync engine and its collaborators.
//!
//! Everything here is serializable via serde; the state store persists these
//! as JSON.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Stable identity of one catalog document across manifest revisions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(pub String);

impl Locator {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Locator {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A manifest maps each locator to its opaque revision marker.
///
/// Ordering is irrelevant to the semantics; `BTreeMap` keeps processing and
/// serialized output deterministic.
pub type Manifest = BTreeMap<Locator, String>;

/// One `(locator, revision)` pair as listed by the manifest source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub locator: Locator,
    pub revision: String,
}

/// Build a [`Manifest`] from listed entries; a later duplicate locator wins.
pub fn manifest_from_entries(entries: impl IntoIterator<Item = ManifestEntry>) -> Manifest {
    entries
        .into_iter()
        .map(|entry| (entry.locator, entry.revision))
        .collect()
}

// ---------------------------------------------------------------------------
// Tracked items
// ---------------------------------------------------------------------------

/// Last successfully completed revision of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub revision: String,
    pub processed_at: DateTime<Utc>,
}

/// Failure bookkeeping for an item. `retry_count` is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub last_error: String,
    pub failed_at: DateTime<Utc>,
    pub retry_count: u32,
}

/// The single live record the state store holds for a locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedItem {
    Processed(ProcessedRecord),
    Failed(FailedRecord),
}

// ---------------------------------------------------------------------------
// Removal audit
// ---------------------------------------------------------------------------

/// One sub-step of the cleanup performed when a locator leaves the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStep {
    KnowledgeBase,
    LocalArtifact,
    Mirror,
    StateRecord,
}

impl CleanupStep {
    pub fn all() -> &'static [CleanupStep] {
        &[
            CleanupStep::KnowledgeBase,
            CleanupStep::LocalArtifact,
            CleanupStep::Mirror,
            CleanupStep::StateRecord,
        ]
    }
}

impl fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupStep::KnowledgeBase => write!(f, "knowledge_base"),
            CleanupStep::LocalArtifact => write!(f, "local_artifact"),
            CleanupStep::Mirror => write!(f, "mirror"),
            CleanupStep::StateRecord => write!(f, "state_record"),
        }
    }
}

/// Append-only audit entry written for every cleanup attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalRecord {
    pub locator: Locator,
    pub removed_at: DateTime<Utc>,
    pub cleanup: BTreeMap<CleanupStep, bool>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_display() {
        assert_eq!(Locator::from("https://x/a.pdf").to_string(), "https://x/a.pdf");
    }

    #[test]
    fn manifest_serializes_as_plain_json_object() {
        let mut manifest = Manifest::new();
        manifest.insert(Locator::from("a"), "2024-01-01".to_string());
        let json = serde_json::to_string(&manifest).expect("serialize");
        assert_eq!(json, r#"{"a":"2024-01-01"}"#);
        let back: Manifest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, manifest);
    }

    #[test]
    fn entries_collect_into_manifest_with_last_duplicate_winning() {
        let manifest = manifest_from_entries(vec![
            ManifestEntry {
                locator: Locator::from("a"),
                revision: "1".to_string(),
            },
            ManifestEntry {
                locator: Locator::from("a"),
                revision: "2".to_string(),
            },
        ]);
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get(&Locator::from("a")).map(String::as_str), Some("2"));
    }

    #[test]
    fn removal_record_uses_snake_case_step_keys() {
        let mut cleanup = BTreeMap::new();
        cleanup.insert(CleanupStep::KnowledgeBase, true);
        cleanup.insert(CleanupStep::StateRecord, false);
        let record = RemovalRecord {
            locator: Locator::from("b"),
            removed_at: Utc::now(),
            cleanup,
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains(r#""knowledge_base":true"#));
        assert!(json.contains(r#""state_record":false"#));
    }
}
