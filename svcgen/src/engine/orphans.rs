//! Entities that left the catalog, and generated files nobody claims.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::artifact::OWNERSHIP_MARKER;
use crate::errors::{GenError, GenResult};
use crate::schema::SchemaCatalog;
use crate::snapshot::SnapshotStore;

/// A snapshot entry whose entity is no longer in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Orphan {
    pub key: String,
    /// Artifact path relative to the project root
    pub artifact: String,
    /// Whether the artifact file is still on disk
    pub exists: bool,
}

/// Snapshot entries with no matching catalog entity, sorted by key.
pub fn find_orphans(
    snapshot: &SnapshotStore,
    catalog: &SchemaCatalog,
    project_root: &Path,
) -> Vec<Orphan> {
    snapshot
        .entries()
        .filter(|(key, _)| !catalog.contains(key))
        .map(|(key, entry)| Orphan {
            key: key.clone(),
            artifact: entry.artifact.clone(),
            exists: project_root.join(&entry.artifact).exists(),
        })
        .collect()
}

/// `.rs` files under `output_dir` that carry managed members but are not
/// the target of any current entity.
pub fn stray_artifacts(output_dir: &Path, expected: &BTreeSet<PathBuf>) -> GenResult<Vec<PathBuf>> {
    if !output_dir.exists() {
        return Ok(Vec::new());
    }

    let mut stray = Vec::new();
    for entry in WalkDir::new(output_dir).sort_by_file_name() {
        let entry = entry.map_err(|err| GenError::Io {
            path: err.path().unwrap_or(output_dir).to_path_buf(),
            source: err.into(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "rs") {
            continue;
        }
        if expected.contains(path) {
            continue;
        }
        let content = std::fs::read_to_string(path).map_err(|err| GenError::io(path, err))?;
        if content.contains(OWNERSHIP_MARKER) {
            stray.push(path.to_path_buf());
        }
    }
    Ok(stray)
}
