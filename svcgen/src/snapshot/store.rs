//! Persisted snapshot map: entity key -> content hash of its last generation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{GenError, GenResult};

const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Last recorded state of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Content hash of the schema representation
    pub hash: String,
    /// Artifact path relative to the project root
    pub artifact: String,
}

/// On-disk layout of the snapshot file.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    generated_at: DateTime<Utc>,
    #[serde(default)]
    entities: BTreeMap<String, SnapshotEntry>,
}

/// Explicit snapshot store, injected into the engine.
///
/// Loaded once, mutated in memory, and rewritten as a whole by [`SnapshotStore::save`].
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    entries: BTreeMap<String, SnapshotEntry>,
}

impl SnapshotStore {
    /// Load the snapshot at `path`; a missing file yields an empty map.
    pub fn load(path: impl Into<PathBuf>) -> GenResult<Self> {
        let path = path.into();
        if !path.exists() {
            debug!("no snapshot at {}, starting empty", path.display());
            return Ok(Self::empty(path));
        }

        let content = std::fs::read_to_string(&path).map_err(|err| GenError::io(&path, err))?;
        let file: SnapshotFile = serde_json::from_str(&content).map_err(|err| GenError::Snapshot {
            message: format!("failed to parse {}: {err}", path.display()),
        })?;

        if file.version > SNAPSHOT_FORMAT_VERSION {
            return Err(GenError::Snapshot {
                message: format!(
                    "{} has format version {}, newer than {SNAPSHOT_FORMAT_VERSION}",
                    path.display(),
                    file.version
                ),
            });
        }

        Ok(Self {
            path,
            entries: file.entities,
        })
    }

    /// An empty store bound to `path`, nothing read from disk.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&SnapshotEntry> {
        self.entries.get(key)
    }

    /// Stored hash for `key`.
    pub fn hash(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.hash.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, entry: SnapshotEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn remove(&mut self, key: &str) -> Option<SnapshotEntry> {
        self.entries.remove(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &SnapshotEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the whole snapshot file.
    ///
    /// The map is written to a sibling temp file and renamed over the
    /// target, so readers see either the old or the new map.
    pub fn save(&self) -> GenResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| GenError::io(parent, err))?;
        }

        let file = SnapshotFile {
            version: SNAPSHOT_FORMAT_VERSION,
            generated_at: Utc::now(),
            entities: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|err| GenError::Snapshot {
            message: format!("failed to serialize snapshot: {err}"),
        })?;

        let mut tmp_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        std::fs::write(&tmp_path, json + "\n").map_err(|err| GenError::io(&tmp_path, err))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|err| GenError::io(&self.path, err))?;
        debug!("wrote snapshot with {} entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hash: &str) -> SnapshotEntry {
        SnapshotEntry {
            hash: hash.to_string(),
            artifact: "src/services/widget/widget_service.rs".to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::load(dir.path().join("snapshot.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".svcgen").join("snapshot.json");

        let mut store = SnapshotStore::empty(&path);
        store.set("WidgetTable", entry("abc"));
        store.set("GadgetTable", entry("def"));
        store.save().unwrap();

        let loaded = SnapshotStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.hash("WidgetTable"), Some("abc"));
        assert!(!path.with_file_name("snapshot.json.tmp").exists());
    }

    #[test]
    fn test_save_replaces_whole_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let mut store = SnapshotStore::empty(&path);
        store.set("WidgetTable", entry("abc"));
        store.set("GadgetTable", entry("def"));
        store.save().unwrap();

        store.remove("GadgetTable");
        store.save().unwrap();

        let loaded = SnapshotStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get("GadgetTable").is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(SnapshotStore::load(&path), Err(GenError::Snapshot { .. })));
    }
}
