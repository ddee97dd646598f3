use anyhow::{Context, Result};
use comfy_table::{Cell, Color as TableColor, Table};
use serde::Serialize;

use svcgen::{Engine, EntityState, EntityStatus, Orphan};

use super::initialized_context;
use crate::output::{Console, Report};
use crate::theme::Tone;

pub const EXAMPLES: &str = "\
Examples:
  svcgen status                Which services are stale, new or missing
  svcgen status --output json  Same, as JSON";

/// Everything `status` reports
#[derive(Serialize)]
struct StatusView {
    entities: Vec<EntityStatus>,
    orphans: Vec<Orphan>,
    stray_artifacts: Vec<String>,
}

pub fn handle_status(console: &Console) -> Result<()> {
    let ctx = initialized_context()?;
    let engine = Engine::open(ctx.engine_config()).context("Failed to load snapshot")?;
    let catalog = engine.load_catalog().context("Failed to load schema module")?;

    let root = engine.config().project_root.clone();
    let view = StatusView {
        entities: engine.status(&catalog)?,
        orphans: engine.orphans(&catalog),
        stray_artifacts: engine
            .stray_artifacts(&catalog)?
            .into_iter()
            .map(|path| path.strip_prefix(&root).unwrap_or(path.as_path()).display().to_string())
            .collect(),
    };
    console.report(&view)?;

    for (key, err) in catalog.rejected() {
        console.say(Tone::Warning, &format!("{key} is not a usable table: {err}"));
    }
    if !view.orphans.is_empty() {
        console.say(Tone::Info, "Run 'svcgen prune' to forget orphaned entities");
    }
    for path in &view.stray_artifacts {
        console.say(Tone::Warning, &format!("{path} has managed members but no entity"));
    }
    Ok(())
}

fn state_label(state: EntityState) -> (&'static str, TableColor) {
    match state {
        EntityState::UpToDate => ("up to date", TableColor::Green),
        EntityState::Changed => ("changed", TableColor::Yellow),
        EntityState::New => ("new", TableColor::Cyan),
        EntityState::MissingArtifact => ("missing file", TableColor::Red),
    }
}

impl Report for StatusView {
    fn table(&self, console: &Console) -> Table {
        let mut table = console.table(&["Entity", "Service", "Artifact", "State"]);

        for entity in &self.entities {
            let (label, color) = state_label(entity.state);
            table.add_row(vec![
                Cell::new(&entity.key),
                Cell::new(&entity.service),
                Cell::new(&entity.artifact),
                console.tint(Cell::new(label), color),
            ]);
        }
        for orphan in &self.orphans {
            table.add_row(vec![
                Cell::new(&orphan.key),
                Cell::new("-"),
                Cell::new(&orphan.artifact),
                console.tint(Cell::new("orphaned"), TableColor::DarkGrey),
            ]);
        }
        table
    }

    fn compact(&self) -> String {
        let stale = self
            .entities
            .iter()
            .filter(|e| e.state != EntityState::UpToDate)
            .count();
        format!(
            "{} entities, {stale} need generation, {} orphaned",
            self.entities.len(),
            self.orphans.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    fn view() -> StatusView {
        StatusView {
            entities: vec![
                EntityStatus {
                    key: "WidgetTable".to_string(),
                    service: "WidgetService".to_string(),
                    artifact: "src/services/widget/widget_service.rs".to_string(),
                    state: EntityState::UpToDate,
                },
                EntityStatus {
                    key: "GadgetTable".to_string(),
                    service: "GadgetService".to_string(),
                    artifact: "src/services/gadget/gadget_service.rs".to_string(),
                    state: EntityState::Changed,
                },
            ],
            orphans: vec![Orphan {
                key: "LegacyTable".to_string(),
                artifact: "src/services/legacy/legacy_service.rs".to_string(),
                exists: true,
            }],
            stray_artifacts: Vec::new(),
        }
    }

    #[test]
    fn test_compact_counts_stale_entities() {
        assert_eq!(view().compact(), "2 entities, 1 need generation, 1 orphaned");
    }

    #[test]
    fn test_table_lists_entities_and_orphans() {
        let console = Console::new(OutputFormat::Table, false, false, false);
        let rendered = view().table(&console).to_string();
        assert!(rendered.contains("WidgetService"));
        assert!(rendered.contains("changed"));
        assert!(rendered.contains("LegacyTable"));
        assert!(rendered.contains("orphaned"));
    }
}
