use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use svcgen::EngineConfig;
use svcgen::config::{
    DEFAULT_OUTPUT_DIR, DEFAULT_RUNTIME_MODULE, DEFAULT_SCHEMA_FILE, DEFAULT_SCHEMA_MODULE,
    DEFAULT_SERVICE_SUFFIX, DEFAULT_SNAPSHOT_FILE,
};
use svcgen::schema::DEFAULT_TABLE_SUFFIX;

/// Project context for svcgen operations
pub struct ProjectContext {
    /// Root directory of the project (where Cargo.toml is)
    pub project_root: PathBuf,
    /// Path to .svcgen directory
    pub svcgen_dir: PathBuf,
    /// Path to config file
    pub config_path: PathBuf,
    /// Loaded configuration (defaults when no config file exists)
    pub config: SvcgenConfig,
}

/// Configuration stored in .svcgen/config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SvcgenConfig {
    #[serde(default)]
    pub generator: GeneratorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSettings {
    #[serde(default = "default_schema_file")]
    pub schema_file: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    #[serde(default = "default_table_suffix")]
    pub table_suffix: String,
    #[serde(default = "default_service_suffix")]
    pub service_suffix: String,
    #[serde(default = "default_schema_module")]
    pub schema_module: String,
    #[serde(default = "default_runtime_module")]
    pub runtime_module: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            schema_file: default_schema_file(),
            output_dir: default_output_dir(),
            snapshot_file: default_snapshot_file(),
            table_suffix: default_table_suffix(),
            service_suffix: default_service_suffix(),
            schema_module: default_schema_module(),
            runtime_module: default_runtime_module(),
        }
    }
}

fn default_schema_file() -> String {
    DEFAULT_SCHEMA_FILE.to_string()
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

fn default_snapshot_file() -> String {
    DEFAULT_SNAPSHOT_FILE.to_string()
}

fn default_table_suffix() -> String {
    DEFAULT_TABLE_SUFFIX.to_string()
}

fn default_service_suffix() -> String {
    DEFAULT_SERVICE_SUFFIX.to_string()
}

fn default_schema_module() -> String {
    DEFAULT_SCHEMA_MODULE.to_string()
}

fn default_runtime_module() -> String {
    DEFAULT_RUNTIME_MODULE.to_string()
}

impl ProjectContext {
    /// Find and load project context from current directory or ancestors
    pub fn find() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::find_from(&current_dir)
    }

    /// Find project context starting from the given directory
    pub fn find_from(start: &Path) -> Result<Self> {
        let project_root = Self::find_project_root(start)?;
        Self::from_root(project_root)
    }

    /// Create context from a known project root
    pub fn from_root(project_root: PathBuf) -> Result<Self> {
        let svcgen_dir = project_root.join(".svcgen");
        let config_path = svcgen_dir.join("config.toml");

        let config = if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config.toml")?;
            toml::from_str(&content).context("Failed to parse config.toml")?
        } else {
            SvcgenConfig::default()
        };

        Ok(Self {
            project_root,
            svcgen_dir,
            config_path,
            config,
        })
    }

    /// Find project root by looking for Cargo.toml
    fn find_project_root(start: &Path) -> Result<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let cargo_toml = current.join("Cargo.toml");
            if cargo_toml.exists() {
                return Ok(current);
            }

            if !current.pop() {
                anyhow::bail!(
                    "Could not find Cargo.toml in {start:?} or any parent directory. \
                     Are you in a Rust project?"
                );
            }
        }
    }

    /// Check if svcgen is initialized in this project
    pub fn is_initialized(&self) -> bool {
        self.config_path.exists()
    }

    /// Engine configuration for this project
    pub fn engine_config(&self) -> EngineConfig {
        let settings = &self.config.generator;
        let mut config = EngineConfig::new(&self.project_root);
        config.schema_file = PathBuf::from(&settings.schema_file);
        config.output_dir = PathBuf::from(&settings.output_dir);
        config.snapshot_file = PathBuf::from(&settings.snapshot_file);
        config.table_suffix = settings.table_suffix.clone();
        config.service_suffix = settings.service_suffix.clone();
        config.schema_module = settings.schema_module.clone();
        config.runtime_module = settings.runtime_module.clone();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SvcgenConfig::default();
        assert_eq!(config.generator.schema_file, "src/schema.rs");
        assert_eq!(config.generator.output_dir, "src/services");
        assert_eq!(config.generator.table_suffix, "Table");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SvcgenConfig =
            toml::from_str("[generator]\noutput_dir = \"src/gen\"\n").unwrap();
        assert_eq!(config.generator.output_dir, "src/gen");
        assert_eq!(config.generator.runtime_module, "crate::db");
    }

    #[test]
    fn test_context_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"app\"\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();

        let context = ProjectContext::find_from(&dir.path().join("src/nested")).unwrap();
        assert_eq!(context.project_root, dir.path());
        assert!(!context.is_initialized());
        assert_eq!(context.engine_config().schema_path(), dir.path().join("src/schema.rs"));
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string_pretty(&SvcgenConfig::default()).unwrap();
        assert!(toml_str.contains("[generator]"));
        assert!(toml_str.contains("schema_module"));
    }
}
