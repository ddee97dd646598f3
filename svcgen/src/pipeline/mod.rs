//! Generator plugins and the pipeline that runs them against one artifact.
//!
//! The pipeline makes sure the service struct and its `impl` block exist,
//! then hands a [`ClassTarget`] to each registered [`GeneratorPlugin`] in
//! registration order. Plugins only see the target through its two edit
//! primitives, so they compose: plugins emitting distinct member names
//! commute, and for a shared name the last registered plugin wins.

mod crud;

use std::path::PathBuf;

use log::debug;
use serde::Serialize;

use crate::artifact::{
    ClassDecl, ClassScaffold, ImportRequirement, MemberSpec, MergeOutcome, SourceArtifact,
    ensure_imports, upsert_member,
};
use crate::errors::GenResult;
use crate::schema::{EntitySchema, FieldDef};

pub use crud::CrudPlugin;

/// Everything a plugin may read about the entity being generated.
#[derive(Debug, Clone)]
pub struct GenerationContext<'a> {
    pub entity: &'a EntitySchema,
    /// Name of the generated type, e.g. `WidgetService`
    pub service_name: String,
    /// Artifact path on disk
    pub target: PathBuf,
    /// Module path the entity table is imported from, e.g. `crate::schema`
    pub schema_module: String,
    /// Module path providing `Db`, `DbResult` and `Page`
    pub runtime_module: String,
}

impl<'a> GenerationContext<'a> {
    pub fn new(entity: &'a EntitySchema, service_suffix: &str, target: impl Into<PathBuf>) -> Self {
        Self {
            entity,
            service_name: format!("{}{service_suffix}", entity.name),
            target: target.into(),
            schema_module: "crate::schema".to_string(),
            runtime_module: "crate::db".to_string(),
        }
    }

    pub fn with_modules(
        mut self,
        schema_module: impl Into<String>,
        runtime_module: impl Into<String>,
    ) -> Self {
        self.schema_module = schema_module.into();
        self.runtime_module = runtime_module.into();
        self
    }

    pub fn entity_key(&self) -> &str {
        &self.entity.key
    }

    /// Type name of the entity table, e.g. `WidgetTable`.
    pub fn table_type(&self) -> &str {
        &self.entity.key
    }

    pub fn table_name(&self) -> &str {
        &self.entity.table
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.entity.fields
    }
}

/// Per-member result recorded while a plugin ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberOutcome {
    pub plugin: String,
    pub member: String,
    pub outcome: MergeOutcome,
}

/// The service type inside one artifact, as handed to plugins.
pub struct ClassTarget<'t> {
    artifact: &'t mut SourceArtifact,
    class: ClassDecl,
    plugin: String,
    outcomes: Vec<MemberOutcome>,
}

impl<'t> ClassTarget<'t> {
    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Make the given symbols importable in the artifact.
    pub fn ensure_imports(&mut self, requirements: &[ImportRequirement]) -> GenResult<usize> {
        ensure_imports(self.artifact, requirements)
    }

    /// Insert or refresh one method, respecting user ownership.
    pub fn upsert_member(&mut self, member: &MemberSpec) -> GenResult<MergeOutcome> {
        let outcome = upsert_member(self.artifact, &self.class, member)?;
        self.outcomes.push(MemberOutcome {
            plugin: self.plugin.clone(),
            member: member.name.clone(),
            outcome,
        });
        Ok(outcome)
    }
}

/// A unit of code generation for one entity.
pub trait GeneratorPlugin {
    /// Stable name used in logs and error reports.
    fn name(&self) -> &str;

    /// Emit imports and members into `target`.
    fn generate(&self, target: &mut ClassTarget<'_>, ctx: &GenerationContext<'_>) -> GenResult<()>;
}

/// Ordered list of plugins.
#[derive(Default)]
pub struct GeneratorPipeline {
    plugins: Vec<Box<dyn GeneratorPlugin>>,
}

impl GeneratorPipeline {
    /// A pipeline with no plugins; only the service scaffold is emitted.
    pub fn new() -> Self {
        Self::default()
    }

    /// A pipeline running the built-in [`CrudPlugin`].
    pub fn with_defaults() -> Self {
        Self::new().register(CrudPlugin)
    }

    pub fn register(mut self, plugin: impl GeneratorPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Run every plugin against `artifact`.
    ///
    /// On error the artifact may hold partial edits; callers restore a
    /// checkpoint taken beforehand.
    pub fn run(
        &self,
        artifact: &mut SourceArtifact,
        ctx: &GenerationContext<'_>,
    ) -> GenResult<Vec<MemberOutcome>> {
        ensure_imports(artifact, &[ImportRequirement::new(&ctx.runtime_module, &["Db"])])?;
        let scaffold = ClassScaffold {
            fields: vec!["pub db: Db".to_string()],
        };
        let class = ClassDecl::resolve(artifact, &ctx.service_name, &scaffold)?;

        let mut target = ClassTarget {
            artifact,
            class,
            plugin: String::new(),
            outcomes: Vec::new(),
        };
        for plugin in &self.plugins {
            debug!("running plugin {} for {}", plugin.name(), ctx.entity_key());
            target.plugin = plugin.name().to_string();
            plugin.generate(&mut target, ctx)?;
        }
        Ok(target.outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::OWNERSHIP_MARKER;
    use crate::errors::GenError;

    fn widget() -> EntitySchema {
        let mut id = FieldDef::new("id", "i64");
        id.primary_key = true;
        EntitySchema {
            key: "WidgetTable".to_string(),
            name: "Widget".to_string(),
            group: "widget".to_string(),
            table: "widgets".to_string(),
            fields: vec![id, FieldDef::new("name", "String")],
        }
    }

    struct CountPlugin {
        body: &'static str,
    }

    impl GeneratorPlugin for CountPlugin {
        fn name(&self) -> &str {
            "count"
        }

        fn generate(
            &self,
            target: &mut ClassTarget<'_>,
            _ctx: &GenerationContext<'_>,
        ) -> GenResult<()> {
            target.upsert_member(&MemberSpec::new("count").returns("u64").body(self.body))?;
            Ok(())
        }
    }

    struct FailingPlugin;

    impl GeneratorPlugin for FailingPlugin {
        fn name(&self) -> &str {
            "failing"
        }

        fn generate(
            &self,
            _target: &mut ClassTarget<'_>,
            ctx: &GenerationContext<'_>,
        ) -> GenResult<()> {
            Err(GenError::plugin(self.name(), format!("cannot handle {}", ctx.entity_key())))
        }
    }

    #[test]
    fn test_empty_pipeline_emits_scaffold() {
        let entity = widget();
        let ctx = GenerationContext::new(&entity, "Service", "widget_service.rs");
        let mut artifact = SourceArtifact::empty("widget_service.rs");

        let outcomes = GeneratorPipeline::new().run(&mut artifact, &ctx).unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(
            artifact.text(),
            "use crate::db::Db;\n\n\
             pub struct WidgetService {\n    pub db: Db,\n}\n\n\
             impl WidgetService {}\n"
        );
    }

    #[test]
    fn test_last_registered_plugin_wins_shared_member() {
        let entity = widget();
        let ctx = GenerationContext::new(&entity, "Service", "widget_service.rs");
        let mut artifact = SourceArtifact::empty("widget_service.rs");
        let pipeline = GeneratorPipeline::new()
            .register(CountPlugin { body: "1" })
            .register(CountPlugin { body: "2" });

        let outcomes = pipeline.run(&mut artifact, &ctx).unwrap();
        let states: Vec<MergeOutcome> = outcomes.iter().map(|o| o.outcome).collect();
        assert_eq!(states, vec![MergeOutcome::Created, MergeOutcome::Overwritten]);
        assert!(artifact.text().contains("-> u64 {\n        2\n    }"));
        assert_eq!(artifact.text().matches(OWNERSHIP_MARKER).count(), 1);
    }

    #[test]
    fn test_plugin_error_propagates() {
        let entity = widget();
        let ctx = GenerationContext::new(&entity, "Service", "widget_service.rs");
        let mut artifact = SourceArtifact::empty("widget_service.rs");
        let pipeline = GeneratorPipeline::with_defaults().register(FailingPlugin);
        assert_eq!(pipeline.plugin_names(), vec!["crud", "failing"]);

        let err = pipeline.run(&mut artifact, &ctx).unwrap_err();
        assert!(matches!(err, GenError::Plugin { ref plugin, .. } if plugin == "failing"));
    }
}
