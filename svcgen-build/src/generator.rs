//! Builder wrapping one engine run plus module file upkeep.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use svcgen::{Engine, EngineConfig, RunReport, SchemaCatalog};

const MODULE_HEADER: &str = "//! Generated service modules. Missing declarations are added.\n";

/// Builder for configuring and running service generation from `build.rs`.
pub struct ServiceGenerator {
    config: EngineConfig,
    module_files: bool,
    rerun_hints: bool,
}

impl ServiceGenerator {
    /// Create a new generator rooted at `CARGO_MANIFEST_DIR` (or the
    /// current directory outside of cargo).
    pub fn new() -> Self {
        let root = std::env::var_os("CARGO_MANIFEST_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            config: EngineConfig::new(root),
            module_files: true,
            rerun_hints: true,
        }
    }

    /// Set the project root that relative paths resolve against.
    pub fn project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.project_root = path.into();
        self
    }

    /// Set the schema module to scan.
    ///
    /// Default: `src/schema.rs`
    pub fn schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.schema_file = path.into();
        self
    }

    /// Set the root directory of the generated services.
    ///
    /// Default: `src/services`
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = path.into();
        self
    }

    /// Set the snapshot file location.
    ///
    /// Default: `.svcgen/snapshot.json`
    pub fn snapshot_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_file = path.into();
        self
    }

    /// Set the module generated code imports entity tables from.
    ///
    /// Default: `crate::schema`
    pub fn schema_module(mut self, module: impl Into<String>) -> Self {
        self.config.schema_module = module.into();
        self
    }

    /// Set the module generated code imports `Db`, `DbResult` and `Page` from.
    ///
    /// Default: `crate::db`
    pub fn runtime_module(mut self, module: impl Into<String>) -> Self {
        self.config.runtime_module = module.into();
        self
    }

    /// Regenerate every entity regardless of the snapshot.
    pub fn force(mut self, force: bool) -> Self {
        self.config.force = force;
        self
    }

    /// Whether to keep `mod.rs` files in the output tree up to date.
    ///
    /// Default: `true`
    pub fn module_files(mut self, enabled: bool) -> Self {
        self.module_files = enabled;
        self
    }

    /// Whether to print `cargo:rerun-if-changed` for the schema module.
    ///
    /// Default: `true`
    pub fn rerun_hints(mut self, enabled: bool) -> Self {
        self.rerun_hints = enabled;
        self
    }

    /// Run the generator.
    ///
    /// Fails when any entity could not be generated, after every other
    /// entity and the module files have been written.
    pub fn run(self) -> Result<RunReport> {
        let schema_path = self.config.schema_path();
        if self.rerun_hints {
            println!("cargo:rerun-if-changed={}", schema_path.display());
        }

        let mut engine = Engine::open(self.config.clone()).context("Failed to load snapshot")?;
        let catalog = engine
            .load_catalog()
            .with_context(|| format!("Failed to scan {}", schema_path.display()))?;
        let report = engine.run(&catalog).context("Failed to commit snapshot")?;

        let touched = report.created.len() + report.updated.len();
        if touched > 0 {
            eprintln!("svcgen-build: {}", report.summary());
        }

        if self.module_files {
            write_module_files(&engine, &catalog)?;
        }

        if report.has_failures() {
            let failed: Vec<String> = report
                .failed
                .iter()
                .map(|f| format!("{}: {}", f.entity, f.reason))
                .collect();
            anyhow::bail!("svcgen-build: {} entities failed:\n{}", failed.len(), failed.join("\n"));
        }

        Ok(report)
    }
}

impl Default for ServiceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Make `mod.rs` of the output root and of each group directory declare
/// every generated service that exists on disk.
///
/// Missing lines are added next to their kind; lines already present,
/// including ones written by hand, are left as they are.
fn write_module_files(engine: &Engine, catalog: &SchemaCatalog) -> Result<()> {
    let config = engine.config();
    let mut groups: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();

    for entity in catalog.entities() {
        let target = config.project_root.join(engine.relative_target(entity));
        if !target.exists() {
            continue;
        }
        let Some(stem) = target.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        groups
            .entry(entity.group.clone())
            .or_default()
            .push((stem.to_string(), format!("{}{}", entity.name, config.service_suffix)));
    }
    if groups.is_empty() {
        return Ok(());
    }

    let output_dir = config.output_path();
    for (group, services) in &groups {
        let path = output_dir.join(group).join("mod.rs");
        let mut content = read_module_file(&path)?;
        for (module, _) in services {
            ensure_module(&mut content, module);
        }
        for (module, service) in services {
            ensure_reexport(&mut content, module, service);
        }
        write_if_changed(&path, &content)?;
    }

    let path = output_dir.join("mod.rs");
    let mut root = read_module_file(&path)?;
    for group in groups.keys() {
        ensure_module(&mut root, group);
    }
    write_if_changed(&path, &root)
}

/// Existing module file contents, or a fresh header.
fn read_module_file(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(format!("{MODULE_HEADER}\n")),
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Name declared by a `mod name;` line with any visibility.
fn declared_module(line: &str) -> Option<&str> {
    let decl = line.strip_suffix(';')?;
    let (visibility, name) = decl.rsplit_once("mod ")?;
    let visibility = visibility.trim();
    (visibility.is_empty() || visibility.starts_with("pub")).then_some(name.trim())
}

fn is_module_decl(line: &str) -> bool {
    declared_module(line).is_some()
}

fn is_use_decl(line: &str) -> bool {
    (line.starts_with("use ") || line.starts_with("pub use ")) && line.ends_with(';')
}

/// Add `pub mod <name>;` unless some line already declares the module.
fn ensure_module(content: &mut String, name: &str) {
    let declared = content.lines().any(|line| declared_module(line.trim()) == Some(name));
    if !declared {
        insert_after_last(content, &format!("pub mod {name};"), is_module_decl);
    }
}

/// Add `pub use <module>::<item>;` unless it is already re-exported.
fn ensure_reexport(content: &mut String, module: &str, item: &str) {
    let path = format!("{module}::{item};");
    let exported = content
        .lines()
        .map(str::trim)
        .any(|line| line.starts_with("pub use ") && line.ends_with(&path));
    if !exported {
        insert_after_last(content, &format!("pub use {path}"), is_use_decl);
    }
}

/// Insert `line` after the last line matching `is_anchor`, or append it
/// as a new paragraph when nothing matches.
fn insert_after_last(content: &mut String, line: &str, is_anchor: fn(&str) -> bool) {
    let mut anchor = None;
    let mut offset = 0;
    for chunk in content.split_inclusive('\n') {
        offset += chunk.len();
        if is_anchor(chunk.trim()) {
            anchor = Some(offset);
        }
    }

    match anchor {
        Some(at) => {
            let separator = if content[..at].ends_with('\n') {
                ""
            } else {
                "\n"
            };
            content.insert_str(at, &format!("{separator}{line}\n"));
        }
        None => {
            if !content.is_empty() {
                if !content.ends_with('\n') {
                    content.push('\n');
                }
                if !content.ends_with("\n\n") {
                    content.push('\n');
                }
            }
            content.push_str(line);
            content.push('\n');
        }
    }
}

/// Only write if content has changed (avoids unnecessary recompilation)
fn write_if_changed(path: &Path, content: &str) -> Result<()> {
    let should_write = match fs::read_to_string(path) {
        Ok(existing) => existing != content,
        Err(_) => true,
    };

    if should_write {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("svcgen-build: Generated {}", path.display());
    }
    Ok(())
}
