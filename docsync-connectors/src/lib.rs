//! # docsync-connectors
//!
//! Concrete implementations of the `docsync-core` boundary traits:
//!
//! - [`SitemapSource`]: manifest from a sitemap XML document
//! - [`HttpFetcher`]: document download over HTTP
//! - [`DirMirror`] / [`HttpMirror`]: artifact mirrors
//! - [`HttpKnowledgeBase`]: knowledge-base source registry
//! - [`CommandConverter`]: external conversion program
//! - [`CommandHook`]: end-of-run suspend command
//!
//! [`from_config`] wires the right set together from a [`docsync_core::Config`].

pub mod command;
pub mod fetcher;
pub mod http;
pub mod knowledge_base;
pub mod mirror;
pub mod sitemap;

use docsync_core::config::MirrorConfig;
use docsync_core::{Config, Mirror};

pub use command::{CommandConverter, CommandHook};
pub use fetcher::HttpFetcher;
pub use knowledge_base::HttpKnowledgeBase;
pub use mirror::{DirMirror, HttpMirror};
pub use sitemap::SitemapSource;

/// Every collaborator a run needs, built from configuration.
pub struct Connectors {
    pub manifest: SitemapSource,
    pub fetcher: HttpFetcher,
    pub converter: CommandConverter,
    pub mirror: Box<dyn Mirror + Send + Sync>,
    pub knowledge_base: HttpKnowledgeBase,
    pub suspend: Option<CommandHook>,
}

pub fn from_config(config: &Config) -> Connectors {
    let agent = http::agent(&config.user_agent, config.pipeline.request_timeout());
    let mirror: Box<dyn Mirror + Send + Sync> = match &config.mirror {
        MirrorConfig::Dir { path } => Box::new(DirMirror::new(path)),
        MirrorConfig::Http { base_url, token } => {
            Box::new(HttpMirror::new(agent.clone(), base_url, token.clone()))
        }
    };
    Connectors {
        manifest: SitemapSource::new(agent.clone(), &config.manifest_url),
        fetcher: HttpFetcher::new(agent.clone()),
        converter: CommandConverter::new(&config.converter),
        mirror,
        knowledge_base: HttpKnowledgeBase::new(
            agent,
            &config.knowledge_base.base_url,
            config.knowledge_base.token.clone(),
        ),
        suspend: config.suspend.as_ref().map(CommandHook::new),
    }
}
