//! Artifact mirrors: a plain directory (usually a mounted share) or an HTTP
//! object endpoint.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use docsync_core::{Mirror, RemoteError};
use ureq::Agent;

use crate::http::{join, remote_err, with_token};

// ---------------------------------------------------------------------------
// Directory mirror
// ---------------------------------------------------------------------------

pub struct DirMirror {
    root: PathBuf,
}

impl DirMirror {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn io_err(path: &Path, source: std::io::Error) -> RemoteError {
        RemoteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Mirror for DirMirror {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), RemoteError> {
        std::fs::create_dir_all(&self.root).map_err(|e| Self::io_err(&self.root, e))?;
        let path = self.root.join(name);
        let tmp = self.root.join(format!(".{name}.tmp"));
        std::fs::write(&tmp, bytes).map_err(|e| Self::io_err(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| Self::io_err(&path, e))?;
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), RemoteError> {
        let path = self.root.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_err(&path, e)),
        }
    }

    fn list(&self) -> Result<BTreeSet<String>, RemoteError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(Self::io_err(&self.root, e)),
        };
        let mut names = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| Self::io_err(&self.root, e))?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                names.insert(name);
            }
        }
        Ok(names)
    }
}

// ---------------------------------------------------------------------------
// HTTP mirror
// ---------------------------------------------------------------------------

/// `PUT`/`DELETE <base_url>/<name>`, and `GET <base_url>/` answering a JSON
/// array of object names.
pub struct HttpMirror {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpMirror {
    pub fn new(agent: Agent, base_url: &str, token: Option<String>) -> Self {
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

impl Mirror for HttpMirror {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), RemoteError> {
        let url = join(&self.base_url, name);
        with_token(self.agent.put(&url), self.token.as_deref())
            .send_bytes(bytes)
            .map_err(|e| remote_err(&url, e))?;
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), RemoteError> {
        let url = join(&self.base_url, name);
        match with_token(self.agent.delete(&url), self.token.as_deref()).call() {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(404, _)) => Ok(()),
            Err(e) => Err(remote_err(&url, e)),
        }
    }

    fn list(&self) -> Result<BTreeSet<String>, RemoteError> {
        let url = format!("{}/", self.base_url);
        let response = with_token(self.agent.get(&url), self.token.as_deref())
            .call()
            .map_err(|e| remote_err(&url, e))?;
        let names: Vec<String> = response.into_json().map_err(|e| RemoteError::Payload {
            source_name: url.clone(),
            message: e.to_string(),
        })?;
        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn dir_mirror_put_list_delete() {
        let tmp = TempDir::new().unwrap();
        let mirror = DirMirror::new(tmp.path().join("share"));
        assert!(mirror.list().unwrap().is_empty());

        mirror.put("a.md", b"alpha").unwrap();
        mirror.put("a.md", b"alpha v2").unwrap();
        mirror.put("b.md", b"beta").unwrap();
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("share/a.md")).unwrap(),
            "alpha v2"
        );
        let names: Vec<_> = mirror.list().unwrap().into_iter().collect();
        assert_eq!(names, vec!["a.md", "b.md"]);

        mirror.delete("a.md").unwrap();
        mirror.delete("a.md").unwrap();
        assert!(!mirror.list().unwrap().contains("a.md"));
    }
}
