//! JSON persistence shared by the state store and the manifest snapshot.
//!
//! Writes use the atomic `.tmp` + rename pattern. Reads never fail the run: a
//! missing file is the first run, an unreadable or corrupt file is logged and
//! treated as empty so the pipeline stays available.

use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{io_err, SyncError};

/// Load `path` as JSON, falling back to `T::default()` when the file is
/// absent or unusable.
pub(crate) fn load_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return T::default(),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "state file unreadable; starting from empty",
            );
            return T::default();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "state file corrupt; starting from empty",
            );
            T::default()
        }
    }
}

/// Save `value` to `path` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub(crate) fn save_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid state path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_loads_default() {
        let tmp = TempDir::new().unwrap();
        let loaded: BTreeMap<String, String> = load_or_default(&tmp.path().join("nope.json"));
        assert!(loaded.is_empty());
    }

    #[test]
    fn corrupt_file_loads_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let loaded: BTreeMap<String, String> = load_or_default(&path);
        assert!(loaded.is_empty());
    }

    #[test]
    fn save_creates_parent_and_cleans_tmp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state").join("x.json");
        let mut value = BTreeMap::new();
        value.insert("k".to_string(), "v".to_string());

        save_atomic(&path, &value).unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        let loaded: BTreeMap<String, String> = load_or_default(&path);
        assert_eq!(loaded, value);
    }
}
