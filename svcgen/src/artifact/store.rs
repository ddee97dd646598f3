use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::{debug, info};

use super::SourceArtifact;
use crate::errors::{GenError, GenResult};

/// Result of flushing one dirty artifact.
#[derive(Debug)]
pub struct SaveOutcome {
    pub path: PathBuf,
    pub result: Result<(), GenError>,
}

/// Every artifact touched during a run, keyed by normalized path.
///
/// Loading the same path twice hands back the same in-memory artifact,
/// so edits from several entities to one file accumulate.
#[derive(Debug, Default)]
pub struct SourceArtifactStore {
    artifacts: BTreeMap<PathBuf, SourceArtifact>,
}

impl SourceArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path` from disk, or start an empty artifact if it does not exist.
    ///
    /// A file that exists but does not parse is a [`GenError::Parse`] and is
    /// not cached, so the next load re-reads it.
    pub fn load(&mut self, path: impl AsRef<Path>) -> GenResult<&mut SourceArtifact> {
        let path = normalize_path(path.as_ref());
        match self.artifacts.entry(path) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = entry.key().clone();
                let artifact = match fs::read_to_string(&path) {
                    Ok(text) => SourceArtifact::from_existing(&path, text)?,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        debug!("{} does not exist yet", path.display());
                        SourceArtifact::empty(&path)
                    }
                    Err(err) => return Err(GenError::io(&path, err)),
                };
                Ok(entry.insert(artifact))
            }
        }
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&SourceArtifact> {
        self.artifacts.get(&normalize_path(path.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Paths of artifacts whose text differs from disk.
    pub fn dirty_paths(&self) -> Vec<&Path> {
        self.artifacts
            .values()
            .filter(|a| a.is_dirty())
            .map(|a| a.path())
            .collect()
    }

    /// Write every dirty artifact, creating parent directories as needed.
    ///
    /// One failed write does not stop the others; each path reports its own
    /// result.
    pub fn save_all(&mut self) -> Vec<SaveOutcome> {
        let mut outcomes = Vec::new();
        for artifact in self.artifacts.values_mut().filter(|a| a.is_dirty()) {
            let path = artifact.path().to_path_buf();
            let result = write_artifact(artifact);
            match &result {
                Ok(()) => {
                    info!("wrote {}", path.display());
                    artifact.mark_saved();
                }
                Err(err) => log::error!("{err}"),
            }
            outcomes.push(SaveOutcome { path, result });
        }
        outcomes
    }
}

fn write_artifact(artifact: &SourceArtifact) -> GenResult<()> {
    let path = artifact.path();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| GenError::io(parent, err))?;
    }
    fs::write(path, artifact.text()).map_err(|err| GenError::io(path, err))
}

/// Resolve `.` and `..` lexically so equivalent spellings share one artifact.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
