//! `use` declaration reconciliation.

use log::debug;
use quote::ToTokens;
use syn::{Item, ItemUse, UseTree};

use super::SourceArtifact;
use super::text::LineIndex;
use crate::errors::GenResult;

/// Symbols that must be importable from one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequirement {
    pub module: String,
    pub symbols: Vec<String>,
}

impl ImportRequirement {
    pub fn new(module: impl Into<String>, symbols: &[&str]) -> Self {
        Self {
            module: module.into(),
            symbols: symbols.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Make every requirement's symbols importable, returning how many were added.
///
/// Symbols already imported from the module (by name or glob) are left
/// alone. Missing ones are merged into an existing flat `use module::...;`
/// or, failing that, into a new `use` item after the last one.
pub fn ensure_imports(
    artifact: &mut SourceArtifact,
    requirements: &[ImportRequirement],
) -> GenResult<usize> {
    let mut added = 0;
    for requirement in requirements {
        added += ensure_import(artifact, requirement)?;
    }
    Ok(added)
}

fn ensure_import(
    artifact: &mut SourceArtifact,
    requirement: &ImportRequirement,
) -> GenResult<usize> {
    let syntax = artifact.syntax()?;
    let uses: Vec<&ItemUse> = syntax
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Use(item_use) => Some(item_use),
            _ => None,
        })
        .collect();

    let mut imported = Vec::new();
    for item_use in &uses {
        collect_imports(&item_use.tree, &use_prefix(item_use), &mut imported);
    }

    let module = requirement.module.as_str();
    let mut missing: Vec<String> = Vec::new();
    for symbol in &requirement.symbols {
        let satisfied = imported
            .iter()
            .any(|(m, name)| m == module && (name == symbol || name == "*"));
        if !satisfied && !missing.contains(symbol) {
            missing.push(symbol.clone());
        }
    }
    if missing.is_empty() {
        return Ok(0);
    }

    debug!(
        "{}: importing {} from {module}",
        artifact.path().display(),
        missing.join(", ")
    );

    let text = artifact.text().to_string();
    let index = LineIndex::new(&text);

    let flat = uses
        .iter()
        .find_map(|u| flat_entries(u, module).map(|entries| (*u, entries)));
    if let Some((item_use, entries)) = flat
        && let Some(range) = index.range_of(item_use.tree.to_token_stream())
    {
        let mut entries = entries;
        entries.extend(missing.iter().cloned());
        let tree = format!("{module}::{{{}}}", entries.join(", "));
        artifact.splice(range, &tree);
        return Ok(missing.len());
    }

    let statement = render_use(module, &missing);
    if let Some(last) = uses.last()
        && let Some(range) = index.range_of(last.to_token_stream())
    {
        match index.next_line_start(range.end) {
            Some(at) => artifact.insert(at, &format!("{statement}\n")),
            None => artifact.insert(range.end, &format!("\n{statement}")),
        }
    } else if let Some(range) = index.range_of(inner_attrs_tokens(&syntax)) {
        match index.next_line_start(range.end) {
            Some(at) => artifact.insert(at, &format!("\n{statement}\n")),
            None => artifact.insert(range.end, &format!("\n\n{statement}\n")),
        }
    } else if text.is_empty() {
        artifact.insert(0, &format!("{statement}\n"));
    } else {
        artifact.insert(0, &format!("{statement}\n\n"));
    }

    Ok(missing.len())
}

fn render_use(module: &str, symbols: &[String]) -> String {
    match symbols {
        [single] => format!("use {module}::{single};"),
        many => format!("use {module}::{{{}}};", many.join(", ")),
    }
}

fn use_prefix(item_use: &ItemUse) -> Vec<String> {
    if item_use.leading_colon.is_some() {
        vec![String::new()]
    } else {
        Vec::new()
    }
}

/// Flatten a use tree into `(module, imported name)` pairs.
///
/// Renamed imports do not count: the original name is not in scope.
fn collect_imports(tree: &UseTree, prefix: &[String], out: &mut Vec<(String, String)>) {
    match tree {
        UseTree::Path(path) => {
            let mut next = prefix.to_vec();
            next.push(path.ident.to_string());
            collect_imports(&path.tree, &next, out);
        }
        UseTree::Name(name) => out.push((prefix.join("::"), name.ident.to_string())),
        UseTree::Glob(_) => out.push((prefix.join("::"), "*".to_string())),
        UseTree::Group(group) => {
            for item in &group.items {
                collect_imports(item, prefix, out);
            }
        }
        UseTree::Rename(_) => {}
    }
}

/// Entries of a `use module::X;` or `use module::{A, B as C, *};` item.
///
/// `None` when the item imports from a different module, nests deeper,
/// or carries attributes such as `#[cfg(...)]`.
fn flat_entries(item_use: &ItemUse, module: &str) -> Option<Vec<String>> {
    if item_use.attrs.iter().any(|a| !a.path().is_ident("doc")) {
        return None;
    }

    let mut segments = use_prefix(item_use);
    let mut tree = &item_use.tree;
    while let UseTree::Path(path) = tree {
        segments.push(path.ident.to_string());
        tree = &path.tree;
    }
    if segments.join("::") != module {
        return None;
    }

    match tree {
        UseTree::Group(group) => group.items.iter().map(leaf_text).collect(),
        leaf => leaf_text(leaf).map(|entry| vec![entry]),
    }
}

fn leaf_text(tree: &UseTree) -> Option<String> {
    match tree {
        UseTree::Name(name) => Some(name.ident.to_string()),
        UseTree::Rename(rename) => Some(format!("{} as {}", rename.ident, rename.rename)),
        UseTree::Glob(_) => Some("*".to_string()),
        UseTree::Path(_) | UseTree::Group(_) => None,
    }
}

fn inner_attrs_tokens(file: &syn::File) -> proc_macro2::TokenStream {
    let mut tokens = proc_macro2::TokenStream::new();
    for attr in &file.attrs {
        attr.to_tokens(&mut tokens);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(source: &str) -> SourceArtifact {
        SourceArtifact::from_existing("service.rs", source.to_string()).unwrap()
    }

    fn require(artifact: &mut SourceArtifact, module: &str, symbols: &[&str]) -> usize {
        ensure_imports(artifact, &[ImportRequirement::new(module, symbols)]).unwrap()
    }

    #[test]
    fn test_merges_into_existing_single_import() {
        let mut artifact = artifact("use crate::db::Db;\n\npub struct S;\n");
        assert_eq!(require(&mut artifact, "crate::db", &["Page"]), 1);
        assert_eq!(artifact.text(), "use crate::db::{Db, Page};\n\npub struct S;\n");
    }

    #[test]
    fn test_merges_into_existing_group() {
        let mut artifact = artifact("use crate::db::{Db, Page as P};\n");
        require(&mut artifact, "crate::db", &["Db", "DbResult"]);
        assert_eq!(artifact.text(), "use crate::db::{Db, Page as P, DbResult};\n");
    }

    #[test]
    fn test_adds_new_statement_after_last_use() {
        let head = "//! Widget service.\n\nuse std::fmt;\nuse crate::db::Db; // runtime\n";
        let mut artifact = artifact(&format!("{head}\npub struct S;\n"));
        require(&mut artifact, "crate::schema", &["WidgetTable"]);
        assert_eq!(
            artifact.text(),
            format!("{head}use crate::schema::WidgetTable;\n\npub struct S;\n")
        );
    }

    #[test]
    fn test_first_import_goes_after_inner_docs() {
        let mut artifact = artifact("//! Widget service.\n\npub struct S;\n");
        require(&mut artifact, "crate::db", &["Db", "Page"]);
        assert_eq!(
            artifact.text(),
            "//! Widget service.\n\nuse crate::db::{Db, Page};\n\npub struct S;\n"
        );
    }

    #[test]
    fn test_empty_file() {
        let mut artifact = SourceArtifact::empty("new.rs");
        require(&mut artifact, "crate::db", &["Db"]);
        assert_eq!(artifact.text(), "use crate::db::Db;\n");
    }

    #[test]
    fn test_is_idempotent() {
        let requirements = [
            ImportRequirement::new("crate::db", &["Db", "DbResult", "Page"]),
            ImportRequirement::new("crate::schema", &["WidgetTable"]),
        ];
        let mut artifact = artifact("pub struct S;\n");
        ensure_imports(&mut artifact, &requirements).unwrap();
        let once = artifact.text().to_string();
        let added = ensure_imports(&mut artifact, &requirements).unwrap();
        assert_eq!(added, 0);
        assert_eq!(artifact.text(), once);
        assert_eq!(once.matches("use crate::db::").count(), 1);
    }

    #[test]
    fn test_nested_and_glob_imports_satisfy_requirements() {
        let source = "use crate::{db::{Db, Page}, schema::*};\n";
        let mut artifact = artifact(source);
        let added = ensure_imports(
            &mut artifact,
            &[
                ImportRequirement::new("crate::db", &["Db", "Page"]),
                ImportRequirement::new("crate::schema", &["WidgetTable"]),
            ],
        )
        .unwrap();
        assert_eq!(added, 0);
        assert_eq!(artifact.text(), source);
    }

    #[test]
    fn test_cfg_gated_import_is_not_merged_into() {
        let mut artifact = artifact("#[cfg(test)]\nuse crate::db::Db;\n");
        require(&mut artifact, "crate::db", &["Page"]);
        assert_eq!(artifact.text(), "#[cfg(test)]\nuse crate::db::Db;\nuse crate::db::Page;\n");
    }
}
