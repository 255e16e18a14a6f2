//! Error types for docsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating or loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading the config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file does not exist.
    #[error("config not found at {path}; create it before running docsync")]
    NotFound { path: PathBuf },

    /// YAML parse error, with the offending path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A value parsed but is unusable.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Failures reported by an external collaborator (manifest source, mirror,
/// knowledge base, conversion engine, suspend hook).
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network-level failure: connect, DNS, TLS, timeout.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The remote answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The remote answered but the payload is unusable.
    #[error("invalid response from {source_name}: {message}")]
    Payload {
        source_name: String,
        message: String,
    },

    /// Local filesystem failure inside a collaborator.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external program failed to start or exited unsuccessfully.
    #[error("command `{program}` failed: {message}")]
    Command { program: String, message: String },
}

impl RemoteError {
    /// `true` for network and timeout failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport { .. })
    }

    /// `true` when the remote reported the target as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::Status { status: 404, .. })
    }
}

pub(crate) fn config_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
