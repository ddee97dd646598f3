//! Flushing artifacts and the snapshot as one commit.
//!
//! Files go first, the snapshot last. A crash in between leaves fresh files
//! with a stale snapshot, which the next run regenerates to identical text.

use std::collections::BTreeSet;
use std::path::PathBuf;

use log::{debug, warn};

use crate::artifact::SourceArtifactStore;
use crate::errors::{GenError, GenResult};
use crate::snapshot::{SnapshotEntry, SnapshotStore};

/// Snapshot entry to record once its artifact is safely on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub key: String,
    /// Artifact path as held by the artifact store
    pub artifact: PathBuf,
    pub entry: SnapshotEntry,
}

/// What a commit wrote and what it had to hold back.
#[derive(Debug, Default)]
pub struct CommitReport {
    pub written: Vec<PathBuf>,
    pub write_failures: Vec<(PathBuf, GenError)>,
    /// Entity keys whose snapshot entry was updated
    pub applied: Vec<String>,
    /// Entity keys whose artifact write failed, with the reason
    pub dropped: Vec<(String, String)>,
}

/// Write every dirty artifact, then record the updates whose artifacts
/// were written (or needed no write) and rewrite the snapshot file.
///
/// Returns an error only when the snapshot file itself cannot be written;
/// artifacts are on disk by then.
pub fn commit(
    store: &mut SourceArtifactStore,
    snapshot: &mut SnapshotStore,
    updates: Vec<PendingUpdate>,
) -> GenResult<CommitReport> {
    let mut report = CommitReport::default();
    let mut failed_paths = BTreeSet::new();

    for outcome in store.save_all() {
        match outcome.result {
            Ok(()) => report.written.push(outcome.path),
            Err(err) => {
                failed_paths.insert(outcome.path.clone());
                report.write_failures.push((outcome.path, err));
            }
        }
    }

    for update in updates {
        if failed_paths.contains(&update.artifact) {
            warn!("not recording {}: write of {} failed", update.key, update.artifact.display());
            let reason = report
                .write_failures
                .iter()
                .find(|(path, _)| *path == update.artifact)
                .map(|(_, err)| err.to_string())
                .unwrap_or_default();
            report.dropped.push((update.key, reason));
            continue;
        }
        snapshot.set(update.key.clone(), update.entry);
        report.applied.push(update.key);
    }

    debug!(
        "committing snapshot with {} entries to {}",
        snapshot.len(),
        snapshot.path().display()
    );
    snapshot.save()?;
    Ok(report)
}
