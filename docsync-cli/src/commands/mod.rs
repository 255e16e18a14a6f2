pub mod diff;
pub mod run;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};

use docsync_connectors::Connectors;
use docsync_core::{config, Config};
use docsync_sync::{Collaborators, ItemCollaborators};

pub(crate) fn home() -> Result<PathBuf> {
    config::home().context("could not determine home directory")
}

pub(crate) fn load_config(home: &std::path::Path) -> Result<Config> {
    config::load_at(home).context("failed to load configuration")
}

pub(crate) fn collaborators(connectors: &Connectors) -> Collaborators<'_> {
    Collaborators {
        manifest: &connectors.manifest,
        item: ItemCollaborators {
            fetcher: &connectors.fetcher,
            converter: &connectors.converter,
            mirror: connectors.mirror.as_ref(),
            knowledge_base: &connectors.knowledge_base,
        },
    }
}
