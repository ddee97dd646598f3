//! One generation run: catalog in, artifacts and snapshot out.

mod commit;
mod orphans;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Value, json};

use crate::artifact::{MergeOutcome, SourceArtifactStore};
use crate::config::EngineConfig;
use crate::errors::{GenError, GenResult};
use crate::naming::to_snake_case;
use crate::pipeline::{GenerationContext, GeneratorPipeline};
use crate::schema::{EntitySchema, SchemaCatalog};
use crate::snapshot::{ChangeDetector, ChangeState, SnapshotEntry, SnapshotStore};

pub use commit::{CommitReport, PendingUpdate, commit};
pub use orphans::{Orphan, find_orphans, stray_artifacts};

/// A member left alone because the user took ownership of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomMember {
    pub entity: String,
    pub member: String,
}

/// An entity that could not be generated this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntity {
    pub entity: String,
    pub reason: String,
}

/// Summary of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Entities whose artifact did not exist before
    pub created: Vec<String>,
    /// Entities whose existing artifact changed
    pub updated: Vec<String>,
    /// Entities regenerated to identical text
    pub unchanged: Vec<String>,
    /// Entities skipped because their schema hash matched
    pub skipped_unchanged: Vec<String>,
    pub skipped_custom: Vec<CustomMember>,
    pub failed: Vec<FailedEntity>,
    /// False for dry runs
    pub committed: bool,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} created, {} updated, {} unchanged, {} skipped (unchanged schema), \
             {} skipped (custom), {} failed",
            self.created.len(),
            self.updated.len(),
            self.unchanged.len(),
            self.skipped_unchanged.len(),
            self.skipped_custom.len(),
            self.failed.len()
        )
    }

    fn fail(&mut self, entity: &str, reason: impl ToString) {
        self.failed.push(FailedEntity {
            entity: entity.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// Per-entity view for `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityStatus {
    pub key: String,
    pub service: String,
    pub artifact: String,
    pub state: EntityState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    UpToDate,
    Changed,
    New,
    /// Schema unchanged but the generated file is gone
    MissingArtifact,
}

/// Owns everything a run mutates: the snapshot and the artifact cache.
pub struct Engine {
    config: EngineConfig,
    pipeline: GeneratorPipeline,
    snapshot: SnapshotStore,
    artifacts: SourceArtifactStore,
}

impl Engine {
    pub fn new(config: EngineConfig, pipeline: GeneratorPipeline, snapshot: SnapshotStore) -> Self {
        Self {
            config,
            pipeline,
            snapshot,
            artifacts: SourceArtifactStore::new(),
        }
    }

    /// Engine with the default pipeline and the snapshot named in `config`.
    pub fn open(config: EngineConfig) -> GenResult<Self> {
        let snapshot = SnapshotStore::load(config.snapshot_path())?;
        Ok(Self::new(config, GeneratorPipeline::with_defaults(), snapshot))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &SnapshotStore {
        &self.snapshot
    }

    pub fn load_catalog(&self) -> GenResult<SchemaCatalog> {
        SchemaCatalog::load(&self.config.schema_path(), &self.config.table_suffix)
    }

    /// Artifact path of `entity`, relative to the project root.
    pub fn relative_target(&self, entity: &EntitySchema) -> PathBuf {
        self.config.relative_target(&entity.group, &to_snake_case(&entity.name))
    }

    /// Value hashed for change detection: the schema plus the generator
    /// settings that shape the output.
    pub fn representation(&self, entity: &EntitySchema) -> GenResult<Value> {
        let schema = serde_json::to_value(entity).map_err(|err| GenError::Schema {
            entity: entity.key.clone(),
            message: err.to_string(),
        })?;
        Ok(json!({
            "schema": schema,
            "generator": {
                "plugins": self.pipeline.plugin_names(),
                "service_suffix": self.config.service_suffix,
                "schema_module": self.config.schema_module,
                "runtime_module": self.config.runtime_module,
            },
        }))
    }

    /// Generate every entity in `catalog`, then commit unless dry-running.
    ///
    /// Per-entity problems land in [`RunReport::failed`]; only a failure to
    /// write the snapshot file is returned as an error.
    pub fn run(&mut self, catalog: &SchemaCatalog) -> GenResult<RunReport> {
        let mut report = RunReport::default();
        let mut updates = Vec::new();

        for (key, err) in catalog.rejected() {
            warn!("{key}: {err}");
            report.fail(key, err);
        }

        for entity in catalog.entities() {
            if let Some(update) = self.generate_entity(entity, &mut report) {
                updates.push(update);
            }
            // Artifacts hold text only, so no span outlives the entity.
            proc_macro2::extra::invalidate_current_thread_spans();
        }

        if self.config.dry_run {
            for path in self.artifacts.dirty_paths() {
                info!("dry run: would write {}", path.display());
            }
            info!("dry run: {}", report.summary());
            return Ok(report);
        }

        let committed = commit(&mut self.artifacts, &mut self.snapshot, updates)?;
        for (entity, reason) in committed.dropped {
            report.created.retain(|k| *k != entity);
            report.updated.retain(|k| *k != entity);
            report.unchanged.retain(|k| *k != entity);
            report.fail(&entity, reason);
        }
        report.committed = true;
        info!("{}", report.summary());
        Ok(report)
    }

    fn generate_entity(
        &mut self,
        entity: &EntitySchema,
        report: &mut RunReport,
    ) -> Option<PendingUpdate> {
        let key = entity.key.as_str();
        let relative = self.relative_target(entity);
        let target = self.config.project_root.join(&relative);

        let representation = match self.representation(entity) {
            Ok(value) => value,
            Err(err) => {
                report.fail(key, err);
                return None;
            }
        };
        let check = ChangeDetector::new(&self.snapshot).check(key, &representation);

        if !check.needs_update() && !self.config.force {
            if target.exists() {
                debug!("{key}: schema unchanged, skipping");
                report.skipped_unchanged.push(key.to_string());
                return None;
            }
            info!("{key}: {} is missing, regenerating", relative.display());
        }

        let artifact = match self.artifacts.load(&target) {
            Ok(artifact) => artifact,
            Err(err) => {
                warn!("{key}: {err}");
                report.fail(key, err);
                return None;
            }
        };

        let ctx = GenerationContext::new(entity, &self.config.service_suffix, &target)
            .with_modules(&self.config.schema_module, &self.config.runtime_module);
        let checkpoint = artifact.checkpoint();

        let outcomes = match self.pipeline.run(artifact, &ctx) {
            Ok(outcomes) => outcomes,
            Err(err) => {
                warn!("{key}: {err}, discarding its edits");
                artifact.restore(checkpoint);
                report.fail(key, err);
                return None;
            }
        };

        if artifact.is_new() {
            report.created.push(key.to_string());
        } else if artifact.text() != checkpoint {
            report.updated.push(key.to_string());
        } else {
            report.unchanged.push(key.to_string());
        }

        let mut custom = BTreeSet::new();
        for outcome in outcomes.iter().filter(|o| o.outcome == MergeOutcome::Skipped) {
            if custom.insert(outcome.member.clone()) {
                report.skipped_custom.push(CustomMember {
                    entity: key.to_string(),
                    member: outcome.member.clone(),
                });
            }
        }

        Some(PendingUpdate {
            key: key.to_string(),
            artifact: artifact.path().to_path_buf(),
            entry: SnapshotEntry {
                hash: check.hash,
                artifact: display_path(&relative),
            },
        })
    }

    /// Compare every catalog entity against the snapshot without generating.
    pub fn status(&self, catalog: &SchemaCatalog) -> GenResult<Vec<EntityStatus>> {
        let detector = ChangeDetector::new(&self.snapshot);
        catalog
            .entities()
            .iter()
            .map(|entity| -> GenResult<EntityStatus> {
                let relative = self.relative_target(entity);
                let check = detector.check(&entity.key, &self.representation(entity)?);
                let on_disk = self.config.project_root.join(&relative).exists();
                let state = match check.state {
                    ChangeState::New => EntityState::New,
                    ChangeState::Changed => EntityState::Changed,
                    ChangeState::Unchanged if !on_disk => EntityState::MissingArtifact,
                    ChangeState::Unchanged => EntityState::UpToDate,
                };
                Ok(EntityStatus {
                    key: entity.key.clone(),
                    service: format!("{}{}", entity.name, self.config.service_suffix),
                    artifact: display_path(&relative),
                    state,
                })
            })
            .collect()
    }

    pub fn orphans(&self, catalog: &SchemaCatalog) -> Vec<Orphan> {
        find_orphans(&self.snapshot, catalog, &self.config.project_root)
    }

    /// Managed files in the output tree that no current entity targets.
    pub fn stray_artifacts(&self, catalog: &SchemaCatalog) -> GenResult<Vec<PathBuf>> {
        let expected: BTreeSet<PathBuf> = catalog
            .entities()
            .iter()
            .map(|entity| self.config.project_root.join(self.relative_target(entity)))
            .collect();
        stray_artifacts(&self.config.output_path(), &expected)
    }

    /// Drop snapshot entries of entities no longer in the catalog.
    ///
    /// Generated files are left on disk; the returned orphans name them.
    pub fn prune(&mut self, catalog: &SchemaCatalog) -> GenResult<Vec<Orphan>> {
        let orphans = self.orphans(catalog);
        if orphans.is_empty() {
            return Ok(orphans);
        }
        for orphan in &orphans {
            info!("pruning snapshot entry {}", orphan.key);
            self.snapshot.remove(&orphan.key);
        }
        if !self.config.dry_run {
            self.snapshot.save()?;
        }
        Ok(orphans)
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
