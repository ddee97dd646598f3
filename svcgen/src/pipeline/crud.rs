//! Reference plugin emitting list/create/update/delete methods.

use crate::artifact::{ImportRequirement, MemberSpec};
use crate::errors::{GenError, GenResult};

use super::{ClassTarget, GenerationContext, GeneratorPlugin};

const LIST_BODY: &str = r#"self.db.select("{table}", &[{columns}], page)"#;
const CREATE_BODY: &str = r#"self.db.insert("{table}", &[{columns}], &input)"#;
const UPDATE_BODY: &str = r#"self.db.update("{table}", "{pk}", &{pk}, &[{writable}], &input)"#;
const DELETE_BODY: &str = r#"self.db.delete("{table}", &[{columns}], "{pk}", &{pk})"#;

/// Emits the four CRUD methods for an entity table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrudPlugin;

impl GeneratorPlugin for CrudPlugin {
    fn name(&self) -> &str {
        "crud"
    }

    fn generate(&self, target: &mut ClassTarget<'_>, ctx: &GenerationContext<'_>) -> GenResult<()> {
        let Some(pk) = ctx.entity.primary_key() else {
            return Err(GenError::plugin(
                self.name(),
                format!(
                    "{} has no primary key (mark one with #[schema(primary_key)])",
                    ctx.entity_key()
                ),
            ));
        };

        let columns = quoted(ctx.fields().iter().map(|f| f.name.as_str()));
        let writable = quoted(
            ctx.fields()
                .iter()
                .filter(|f| !f.primary_key)
                .map(|f| f.name.as_str()),
        );

        let vars = [
            ("table", ctx.table_name().to_string()),
            ("columns", columns),
            ("writable", writable),
            ("pk", pk.name.clone()),
        ];
        let entity = ctx.table_type();
        let pk_param = format!("{}: {}", pk.name, pk.field_type);

        target.ensure_imports(&[
            ImportRequirement::new(&ctx.runtime_module, &["DbResult", "Page"]),
            ImportRequirement::new(&ctx.schema_module, &[entity]),
        ])?;

        let members = [
            MemberSpec::new("list")
                .param("page: Page")
                .returns(format!("DbResult<Vec<{entity}>>"))
                .body(render(LIST_BODY, &vars)),
            MemberSpec::new("create")
                .param(format!("input: {entity}"))
                .returns(format!("DbResult<{entity}>"))
                .body(render(CREATE_BODY, &vars)),
            MemberSpec::new("update")
                .param(pk_param.clone())
                .param(format!("input: {entity}"))
                .returns(format!("DbResult<{entity}>"))
                .body(render(UPDATE_BODY, &vars)),
            MemberSpec::new("delete")
                .param(pk_param)
                .returns(format!("DbResult<Option<{entity}>>"))
                .body(render(DELETE_BODY, &vars)),
        ];

        for member in &members {
            target.upsert_member(member)?;
        }
        Ok(())
    }
}

fn quoted<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.map(|n| format!("\"{n}\"")).collect::<Vec<_>>().join(", ")
}

/// Replace every `{name}` placeholder in `template`.
fn render(template: &str, vars: &[(&str, String)]) -> String {
    vars.iter()
        .fold(template.to_string(), |out, (name, value)| out.replace(&format!("{{{name}}}"), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{MergeOutcome, OWNERSHIP_MARKER, SourceArtifact};
    use crate::pipeline::GeneratorPipeline;
    use crate::schema::{EntitySchema, FieldDef};

    fn widget(primary: bool) -> EntitySchema {
        let mut id = FieldDef::new("id", "i64");
        id.primary_key = primary;
        let mut price = FieldDef::new("price", "f64");
        price.nullable = true;
        EntitySchema {
            key: "WidgetTable".to_string(),
            name: "Widget".to_string(),
            group: "widget".to_string(),
            table: "widgets".to_string(),
            fields: vec![id, FieldDef::new("name", "String"), price],
        }
    }

    #[test]
    fn test_render_substitutes_known_placeholders_only() {
        let vars = [("table", "widgets".to_string())];
        assert_eq!(render("x(\"{table}\", {other})", &vars), "x(\"widgets\", {other})");
    }

    #[test]
    fn test_emits_four_marked_methods() {
        let entity = widget(true);
        let ctx = GenerationContext::new(&entity, "Service", "widget/widget_service.rs");
        let mut artifact = SourceArtifact::empty("widget/widget_service.rs");

        let outcomes = GeneratorPipeline::with_defaults().run(&mut artifact, &ctx).unwrap();
        let names: Vec<&str> = outcomes.iter().map(|o| o.member.as_str()).collect();
        assert_eq!(names, vec!["list", "create", "update", "delete"]);
        assert!(outcomes.iter().all(|o| o.outcome == MergeOutcome::Created));

        let text = artifact.text();
        let imports = "use crate::db::{Db, DbResult, Page};\nuse crate::schema::WidgetTable;\n";
        assert!(text.starts_with(imports));
        assert_eq!(text.matches(OWNERSHIP_MARKER).count(), 4);
        assert!(text.contains("pub fn list(&self, page: Page) -> DbResult<Vec<WidgetTable>> {"));
        assert!(text.contains(r#"self.db.select("widgets", &["id", "name", "price"], page)"#));
        let update = "pub fn update(&self, id: i64, input: WidgetTable) -> DbResult<WidgetTable> {";
        assert!(text.contains(update));
        let update_call = r#"self.db.update("widgets", "id", &id, &["name", "price"], &input)"#;
        assert!(text.contains(update_call));
        assert!(text.contains("pub fn delete(&self, id: i64) -> DbResult<Option<WidgetTable>> {"));
        assert!(artifact.syntax().is_ok());
    }

    #[test]
    fn test_second_run_is_unchanged() {
        let entity = widget(true);
        let ctx = GenerationContext::new(&entity, "Service", "w.rs");
        let mut artifact = SourceArtifact::empty("w.rs");
        let pipeline = GeneratorPipeline::with_defaults();
        pipeline.run(&mut artifact, &ctx).unwrap();
        let first = artifact.text().to_string();

        let outcomes = pipeline.run(&mut artifact, &ctx).unwrap();
        assert!(outcomes.iter().all(|o| o.outcome == MergeOutcome::Unchanged));
        assert_eq!(artifact.text(), first);
    }

    #[test]
    fn test_missing_primary_key_fails_before_emitting() {
        let entity = widget(false);
        let ctx = GenerationContext::new(&entity, "Service", "w.rs");
        let mut artifact = SourceArtifact::empty("w.rs");
        let err = GeneratorPipeline::with_defaults().run(&mut artifact, &ctx).unwrap_err();
        assert!(matches!(err, GenError::Plugin { .. }));
        assert!(!artifact.text().contains("pub fn"));
    }

    #[test]
    fn test_custom_modules_are_imported() {
        let entity = widget(true);
        let ctx = GenerationContext::new(&entity, "Repo", "w.rs").with_modules("models", "storage");
        let mut artifact = SourceArtifact::empty("w.rs");
        GeneratorPipeline::with_defaults().run(&mut artifact, &ctx).unwrap();
        assert!(artifact.text().contains("use storage::{Db, DbResult, Page};"));
        assert!(artifact.text().contains("use models::WidgetTable;"));
        assert!(artifact.text().contains("impl WidgetRepo {"));
    }
}
