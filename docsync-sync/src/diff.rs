//! Manifest differ.
//!
//! Revisions are compared by exact string equality; any difference, including
//! a reformatted timestamp, counts as a change.

use std::collections::BTreeSet;

use docsync_core::{Locator, Manifest};

/// Classification of the locators of two manifests. The three sets are
/// pairwise disjoint; every locator of `new` outside `added ∪ changed` carries
/// the same revision in both manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    pub added: BTreeSet<Locator>,
    pub changed: BTreeSet<Locator>,
    pub removed: BTreeSet<Locator>,
}

impl ManifestDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Compare the last committed manifest with the freshly fetched one.
pub fn diff(old: &Manifest, new: &Manifest) -> ManifestDiff {
    let mut out = ManifestDiff::default();
    for (locator, revision) in new {
        match old.get(locator) {
            None => {
                out.added.insert(locator.clone());
            }
            Some(previous) if previous != revision => {
                out.changed.insert(locator.clone());
            }
            Some(_) => {}
        }
    }
    for locator in old.keys() {
        if !new.contains_key(locator) {
            out.removed.insert(locator.clone());
        }
    }
    out
}
