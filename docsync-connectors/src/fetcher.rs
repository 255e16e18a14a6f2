//! Document download over HTTP.
//!
//! A locator is fetched with a plain `GET`; the body is read into memory up
//! to a size cap. Non-2xx answers surface as `RemoteError::Status`.

use docsync_core::{DocumentFetcher, Locator, RemoteError};
use ureq::Agent;

use crate::http::{read_body, remote_err};

/// Largest document accepted from the catalog.
pub const MAX_DOCUMENT_BYTES: u64 = 256 * 1024 * 1024;

/// Downloads documents with a plain `GET` on the locator.
pub struct HttpFetcher {
    agent: Agent,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            max_bytes: MAX_DOCUMENT_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

impl DocumentFetcher for HttpFetcher {
    fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, RemoteError> {
        let url = locator.as_str();
        let response = self.agent.get(url).call().map_err(|e| remote_err(url, e))?;
        let body = read_body(url, response, self.max_bytes)?;
        tracing::debug!(locator = %locator, bytes = body.len(), "document downloaded");
        Ok(body)
    }
}
