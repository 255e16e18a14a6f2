//! Converted artifact naming, attribution and local persistence.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use docsync_core::Locator;

use crate::error::{io_err, SyncError};

/// Extension of every converted artifact.
pub const ARTIFACT_EXTENSION: &str = "md";

/// Derive the stable artifact name for a locator.
///
/// The document file name is taken from an `ind=` query parameter when the
/// catalog uses one, otherwise from the last path segment. A `<digits>wpdm_`
/// upload prefix is stripped, the extension becomes `.md`, unsafe characters
/// become `_`, and an 8-hex-digit digest of the full locator keeps distinct
/// locators from sharing a name.
///
/// `https://x/download?ind=1712wpdm_Guide.pdf` → `Guide-<hash>.md`
pub fn artifact_name(locator: &Locator) -> String {
    let raw = source_file_name(locator.as_str());
    let stem = match raw.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => raw,
    };
    let stem = strip_upload_prefix(stem);
    let mut safe: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.trim_matches(|c| c == '_' || c == '.').is_empty() {
        safe = "document".to_string();
    }
    format!("{safe}-{}.{ARTIFACT_EXTENSION}", short_digest(locator.as_str()))
}

/// Extension of the source document (`pdf`, `docx`, …), if the locator
/// carries one. Used to name the scratch download.
pub fn source_extension(locator: &Locator) -> Option<String> {
    let name = source_file_name(locator.as_str());
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Append the attribution footer pointing back to the source document.
pub fn with_footer(text: &str, locator: &Locator) -> String {
    format!(
        "{}\n\n---\n\n**Source:** [{locator}]({locator})\n",
        text.trim_end()
    )
}

/// Local path of the converted artifact for `locator`.
pub fn artifact_path(artifacts_dir: &Path, locator: &Locator) -> PathBuf {
    artifacts_dir.join(artifact_name(locator))
}

/// Write `content` to `path` via `<path>.tmp` + rename.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Delete `path`; an absent file counts as success. Returns whether a file
/// was actually removed.
pub fn remove_if_exists(path: &Path) -> Result<bool, SyncError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(io_err(path, err)),
    }
}

fn source_file_name(locator: &str) -> &str {
    for marker in ["&ind=", "?ind="] {
        if let Some((_, after)) = locator.rsplit_once(marker) {
            let value = after.split(['&', '#']).next().unwrap_or(after);
            if !value.is_empty() {
                return value;
            }
        }
    }
    let without_query = locator.split(['?', '#']).next().unwrap_or(locator);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(without_query)
}

fn strip_upload_prefix(stem: &str) -> &str {
    let digits = stem.len() - stem.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(rest) = stem[digits..].strip_prefix("wpdm_") {
            if !rest.is_empty() {
                return rest;
            }
        }
    }
    stem
}

fn short_digest(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..8].to_string()
}
