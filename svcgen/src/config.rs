//! Run configuration for the generation engine.

use std::path::{Path, PathBuf};

use crate::schema::DEFAULT_TABLE_SUFFIX;

/// Default location of the schema module, relative to the project root.
pub const DEFAULT_SCHEMA_FILE: &str = "src/schema.rs";
/// Default root of the generated tree, relative to the project root.
pub const DEFAULT_OUTPUT_DIR: &str = "src/services";
/// Default snapshot file, relative to the project root.
pub const DEFAULT_SNAPSHOT_FILE: &str = ".svcgen/snapshot.json";
pub const DEFAULT_SERVICE_SUFFIX: &str = "Service";
pub const DEFAULT_SCHEMA_MODULE: &str = "crate::schema";
pub const DEFAULT_RUNTIME_MODULE: &str = "crate::db";

/// Everything one engine run needs to know. Relative paths are resolved
/// against `project_root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub project_root: PathBuf,
    pub schema_file: PathBuf,
    pub output_dir: PathBuf,
    pub snapshot_file: PathBuf,
    /// Struct name suffix marking an entity table
    pub table_suffix: String,
    /// Suffix appended to the entity name for the generated type
    pub service_suffix: String,
    /// Module generated code imports entity tables from
    pub schema_module: String,
    /// Module generated code imports `Db`, `DbResult` and `Page` from
    pub runtime_module: String,
    /// Regenerate every entity regardless of the snapshot
    pub force: bool,
    /// Run every step except writing files and the snapshot
    pub dry_run: bool,
}

impl EngineConfig {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            schema_file: PathBuf::from(DEFAULT_SCHEMA_FILE),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            snapshot_file: PathBuf::from(DEFAULT_SNAPSHOT_FILE),
            table_suffix: DEFAULT_TABLE_SUFFIX.to_string(),
            service_suffix: DEFAULT_SERVICE_SUFFIX.to_string(),
            schema_module: DEFAULT_SCHEMA_MODULE.to_string(),
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
            force: false,
            dry_run: false,
        }
    }

    pub fn schema_path(&self) -> PathBuf {
        self.resolve(&self.schema_file)
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.resolve(&self.snapshot_file)
    }

    /// Artifact path for an entity, relative to the project root.
    pub fn relative_target(&self, group: &str, snake_name: &str) -> PathBuf {
        self.output_dir
            .join(group)
            .join(format!("{snake_name}_{}.rs", crate::naming::to_snake_case(&self.service_suffix)))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}
