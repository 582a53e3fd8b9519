//! Shared read/write helpers for the shim's JSON map files.
//!
//! Reads degrade: an unreadable or corrupt file is treated as an empty map
//! and rebuilt by the next successful write. Writes are atomic via a sibling
//! temp file renamed over the target.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create state directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write state file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize state for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn read_json_map<T: DeserializeOwned>(path: &Path) -> BTreeMap<String, T> {
    let body = match fs::read_to_string(path) {
        Ok(body) => body,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                log::warn!("unreadable state file {}: {err}", path.display());
            }
            return BTreeMap::new();
        }
    };
    match serde_json::from_str(&body) {
        Ok(map) => map,
        Err(err) => {
            log::warn!(
                "corrupt state file {} treated as empty: {err}",
                path.display()
            );
            BTreeMap::new()
        }
    }
}

pub fn write_json_map<T: Serialize>(
    path: &Path,
    map: &BTreeMap<String, T>,
) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let body = serde_json::to_string_pretty(map).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let temp = path.with_extension("json.tmp");
    fs::write(&temp, body).map_err(|source| StoreError::Write {
        path: temp.clone(),
        source,
    })?;
    fs::rename(&temp, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_missing_file_yields_empty_map() {
        let map: BTreeMap<String, String> = read_json_map(Path::new("/definitely/not/here.json"));
        assert!(map.is_empty());
    }

    #[test]
    fn read_corrupt_file_yields_empty_map() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("state.json");
        fs::write(&path, "][").expect("write corrupt file");

        let map: BTreeMap<String, u32> = read_json_map(&path);
        assert!(map.is_empty());
    }

    #[test]
    fn write_then_read_round_trips_and_creates_parents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested/dir/state.json");

        let mut map = BTreeMap::new();
        map.insert("key".to_string(), 7u32);
        write_json_map(&path, &map).expect("write map");

        let restored: BTreeMap<String, u32> = read_json_map(&path);
        assert_eq!(restored, map);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
