//! YAML configuration.
//!
//! Loaded from `<home>/.docsync/config.yaml`. Only `manifest_url`, `mirror`,
//! `knowledge_base` and `converter` are required; everything else defaults.
//! Secrets may be supplied through the environment instead of the file:
//!
//! | variable | overrides |
//! |---|---|
//! | `DOCSYNC_MANIFEST_URL` | `manifest_url` |
//! | `DOCSYNC_KB_TOKEN` | `knowledge_base.token` |
//! | `DOCSYNC_MIRROR_TOKEN` | `mirror.token` (http mirror only) |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{config_io_err, ConfigError};
use crate::paths;

pub const ENV_MANIFEST_URL: &str = "DOCSYNC_MANIFEST_URL";
pub const ENV_KB_TOKEN: &str = "DOCSYNC_KB_TOKEN";
pub const ENV_MIRROR_TOKEN: &str = "DOCSYNC_MIRROR_TOKEN";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub manifest_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub mirror: MirrorConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub converter: CommandConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspend: Option<CommandConfig>,
    /// Push the run log to the mirror at the end of every run.
    #[serde(default)]
    pub upload_log: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: u32,
}

impl RetryConfig {
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.cooldown_days))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            cooldown_days: default_cooldown_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pause between two processed items.
    #[serde(default = "default_item_delay_secs")]
    pub item_delay_secs: u64,
    /// Upper bound for every network call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Downloads smaller than this are not treated as documents.
    #[serde(default = "default_min_document_bytes")]
    pub min_document_bytes: usize,
    /// Extracted text shorter than this is a conversion failure.
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    #[serde(default = "default_language")]
    pub language: String,
    /// Accept an empty manifest after a non-empty one and clean up every
    /// prior locator. Off by default: an empty listing is usually an outage.
    #[serde(default)]
    pub allow_empty_manifest: bool,
}

impl PipelineConfig {
    pub fn item_delay(&self) -> Duration {
        Duration::from_secs(self.item_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            item_delay_secs: default_item_delay_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            min_document_bytes: default_min_document_bytes(),
            min_text_chars: default_min_text_chars(),
            language: default_language(),
            allow_empty_manifest: false,
        }
    }
}

/// Where converted artifacts are mirrored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MirrorConfig {
    /// A directory, typically a mounted share.
    Dir { path: PathBuf },
    /// An HTTP object endpoint accepting `PUT`/`DELETE` per object and
    /// listing names as a JSON array on `GET <base_url>/`.
    Http {
        base_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// An external program invocation. `args` may contain the placeholders
/// `{input}` and `{language}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_cooldown_days() -> u32 {
    7
}

fn default_item_delay_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_min_document_bytes() -> usize {
    1024
}

fn default_min_text_chars() -> usize {
    100
}

fn default_language() -> String {
    "fr".to_string()
}

impl Config {
    /// Parse a config document and validate it.
    pub fn from_yaml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides. `lookup` is `std::env::var(..).ok()` in
    /// production and a map lookup in tests.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_MANIFEST_URL).filter(|v| !v.is_empty()) {
            self.manifest_url = url;
        }
        if let Some(token) = lookup(ENV_KB_TOKEN).filter(|v| !v.is_empty()) {
            self.knowledge_base.token = Some(token);
        }
        if let Some(value) = lookup(ENV_MIRROR_TOKEN).filter(|v| !v.is_empty()) {
            if let MirrorConfig::Http { token, .. } = &mut self.mirror {
                *token = Some(value);
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.manifest_url.trim().is_empty() {
            return Err(ConfigError::Invalid("manifest_url is empty".to_string()));
        }
        if self.retry.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_retries must be at least 1".to_string(),
            ));
        }
        if self.converter.program.trim().is_empty() {
            return Err(ConfigError::Invalid("converter.program is empty".to_string()));
        }
        Ok(())
    }
}

/// Load `<home>/.docsync/config.yaml` and apply environment overrides.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = paths::config_path(home);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| config_io_err(&path, e))?;
    let mut config = Config::from_yaml(&path, &contents)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
