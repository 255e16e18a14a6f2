//! HTTP client for the knowledge-base source registry.
//!
//! - `GET    <base>/sources`       JSON array of `{ id, name }`
//! - `POST   <base>/sources`       JSON `{ name, url, content }`
//! - `DELETE <base>/sources/<id>`  404 counts as already deleted

use docsync_core::{KbSource, KnowledgeBase, Locator, RemoteError};
use serde::{Deserialize, Serialize};
use ureq::Agent;

use crate::http::{join, remote_err, with_token};

pub struct HttpKnowledgeBase {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct SourceDto {
    id: serde_json::Value,
    name: String,
}

#[derive(Serialize)]
struct NewSource<'a> {
    name: &'a str,
    url: &'a str,
    content: &'a str,
}

impl HttpKnowledgeBase {
    pub fn new(agent: Agent, base_url: &str, token: Option<String>) -> Self {
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn sources_url(&self) -> String {
        format!("{}/sources", self.base_url)
    }
}

impl KnowledgeBase for HttpKnowledgeBase {
    fn list_sources(&self) -> Result<Vec<KbSource>, RemoteError> {
        let url = self.sources_url();
        let response = with_token(self.agent.get(&url), self.token.as_deref())
            .call()
            .map_err(|e| remote_err(&url, e))?;
        let sources: Vec<SourceDto> = response.into_json().map_err(|e| RemoteError::Payload {
            source_name: url.clone(),
            message: e.to_string(),
        })?;
        sources
            .into_iter()
            .map(|source| {
                let id = match source.id {
                    serde_json::Value::String(id) => id,
                    serde_json::Value::Number(id) => id.to_string(),
                    other => {
                        return Err(RemoteError::Payload {
                            source_name: url.clone(),
                            message: format!("unexpected source id {other}"),
                        })
                    }
                };
                Ok(KbSource {
                    id,
                    name: source.name,
                })
            })
            .collect()
    }

    fn create_source(
        &self,
        locator: &Locator,
        name: &str,
        content: &str,
    ) -> Result<(), RemoteError> {
        let url = self.sources_url();
        with_token(self.agent.post(&url), self.token.as_deref())
            .send_json(NewSource {
                name,
                url: locator.as_str(),
                content,
            })
            .map_err(|e| remote_err(&url, e))?;
        Ok(())
    }

    fn delete_source(&self, id: &str) -> Result<(), RemoteError> {
        let url = join(&self.sources_url(), id);
        match with_token(self.agent.delete(&url), self.token.as_deref()).call() {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(404, _)) => Ok(()),
            Err(e) => Err(remote_err(&url, e)),
        }
    }
}
