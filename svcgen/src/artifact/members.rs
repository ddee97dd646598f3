//! Ownership-aware method upserts.
//!
//! A method is engine-owned exactly when one of its doc lines contains
//! [`OWNERSHIP_MARKER`]. Deleting that line hands the method to the user;
//! the engine will never touch it again unless the line comes back.

use std::fmt::Write;

use log::{debug, warn};
use quote::ToTokens;
use serde::Serialize;
use syn::{Attribute, Expr, ExprLit, ImplItem, ImplItemFn, ItemImpl, Lit, Meta};

use super::SourceArtifact;
use super::class::ClassDecl;
use super::text::{LineIndex, indent_lines};
use crate::errors::{GenError, GenResult};

/// Token that marks a method as engine-owned.
pub const OWNERSHIP_MARKER: &str = "@svcgen-managed";

/// Full doc line written above every engine-owned method.
const MARKER_DOC: &str = "@svcgen-managed: delete this line to take ownership of this method";

const INDENT_UNIT: &str = "    ";

/// Desired shape of one generated method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSpec {
    pub name: String,
    /// Parameters including the receiver, e.g. `["&self", "id: i64"]`
    pub params: Vec<String>,
    pub return_type: Option<String>,
    /// Body statements without surrounding braces or indentation
    pub body: String,
}

impl MemberSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: vec!["&self".to_string()],
            return_type: None,
            body: String::new(),
        }
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn returns(mut self, ty: impl Into<String>) -> Self {
        self.return_type = Some(ty.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Render the method with `kept` attributes above the marker line.
    fn render(&self, indent: &str, kept: &[String]) -> String {
        let mut out = String::new();
        for attr in kept {
            let _ = writeln!(out, "{indent}{attr}");
        }
        let _ = writeln!(out, "{indent}/// {MARKER_DOC}");

        let ret = self
            .return_type
            .as_deref()
            .map(|ty| format!(" -> {ty}"))
            .unwrap_or_default();
        let _ = writeln!(out, "{indent}pub fn {}({}){ret} {{", self.name, self.params.join(", "));

        let body = indent_lines(self.body.trim_matches('\n'), &format!("{indent}{INDENT_UNIT}"));
        if !body.is_empty() {
            let _ = writeln!(out, "{body}");
        }
        let _ = write!(out, "{indent}}}");
        out
    }
}

/// What an upsert did to one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Method was absent and has been inserted with the marker
    Created,
    /// Marked method was rewritten with different text
    Overwritten,
    /// Marked method already matched the generated text
    Unchanged,
    /// Method exists without the marker and was left alone
    Skipped,
}

/// True when any doc line of `attrs` carries [`OWNERSHIP_MARKER`].
pub fn has_ownership_marker(attrs: &[Attribute]) -> bool {
    attrs.iter().any(is_marker_attr)
}

fn is_marker_attr(attr: &Attribute) -> bool {
    match &attr.meta {
        Meta::NameValue(nv) if nv.path.is_ident("doc") => matches!(
            &nv.value,
            Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) if s.value().contains(OWNERSHIP_MARKER)
        ),
        _ => false,
    }
}

/// Insert, overwrite or skip method `member.name` inside `class`.
///
/// The class must already exist (see [`ClassDecl::resolve`]).
pub fn upsert_member(
    artifact: &mut SourceArtifact,
    class: &ClassDecl,
    member: &MemberSpec,
) -> GenResult<MergeOutcome> {
    let syntax = artifact.syntax()?;
    let impls: Vec<&ItemImpl> = class.inherent_impls(&syntax).collect();
    let Some(item_impl) = impls.first().copied() else {
        return Err(GenError::Edit {
            path: artifact.path().to_path_buf(),
            message: format!("no impl block for {}", class.name()),
        });
    };

    let text = artifact.text().to_string();
    let index = LineIndex::new(&text);
    let located = |tokens| {
        index.range_of(tokens).ok_or_else(|| GenError::Edit {
            path: artifact.path().to_path_buf(),
            message: format!("cannot locate {}::{} in source", class.name(), member.name),
        })
    };

    // Any inherent impl block of the class may hold the method.
    let found: Vec<&ImplItemFn> = impls
        .iter()
        .flat_map(|block| block.items.iter())
        .filter_map(|item| match item {
            ImplItem::Fn(f) if f.sig.ident == member.name => Some(f),
            _ => None,
        })
        .collect();

    if found.iter().any(|f| !has_ownership_marker(&f.attrs)) {
        warn!(
            "{}: {}::{} has no ownership marker, leaving it as written",
            artifact.path().display(),
            class.name(),
            member.name
        );
        return Ok(MergeOutcome::Skipped);
    }

    if let Some(existing) = found.first() {
        let range = located(existing.to_token_stream())?;
        let kept = kept_attrs(existing, &index, &text);
        let (start, replacement) = match index.indent_before(range.start) {
            Some(indent) => (index.line_start(range.start), member.render(indent, &kept)),
            None => (range.start, member.render("", &kept)),
        };

        if text[start..range.end] == replacement {
            return Ok(MergeOutcome::Unchanged);
        }
        debug!("{}: refreshing {}::{}", artifact.path().display(), class.name(), member.name);
        artifact.splice(start..range.end, &replacement);
        return Ok(MergeOutcome::Overwritten);
    }

    let impl_start = located(item_impl.impl_token.to_token_stream())?.start;
    let impl_indent = index.indent_before(impl_start).unwrap_or("");
    let indent = format!("{impl_indent}{INDENT_UNIT}");
    let rendered = member.render(&indent, &[]);

    let open = index.end_of(item_impl.brace_token.span.open());
    let close = index.start_of(item_impl.brace_token.span.close());
    let interior = &text[open..close];

    debug!("{}: adding {}::{}", artifact.path().display(), class.name(), member.name);
    if let Some(last) = item_impl.items.last() {
        let after = located(last.to_token_stream())?.end;
        artifact.insert(after, &format!("\n\n{rendered}"));
    } else if interior.trim().is_empty() {
        artifact.splice(open..close, &format!("\n{rendered}\n{impl_indent}"));
    } else {
        let after = open + interior.trim_end().len();
        artifact.insert(after, &format!("\n\n{rendered}"));
    }
    Ok(MergeOutcome::Created)
}

/// Source text of every attribute except marker doc lines, in order.
fn kept_attrs(existing: &ImplItemFn, index: &LineIndex<'_>, text: &str) -> Vec<String> {
    existing
        .attrs
        .iter()
        .filter(|attr| !is_marker_attr(attr))
        .filter_map(|attr| index.range_of(attr.to_token_stream()))
        .map(|range| text[range].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ClassScaffold;

    const MARKER_LINE: &str =
        "/// @svcgen-managed: delete this line to take ownership of this method";

    fn list_member(columns: &str) -> MemberSpec {
        MemberSpec::new("list")
            .param("page: Page")
            .returns("DbResult<Vec<WidgetTable>>")
            .body(format!("self.db.select(\"widgets\", &[{columns}], page)"))
    }

    fn load(source: &str) -> (SourceArtifact, ClassDecl) {
        let mut artifact = SourceArtifact::from_existing("w.rs", source.to_string()).unwrap();
        let class =
            ClassDecl::resolve(&mut artifact, "WidgetService", &ClassScaffold::default()).unwrap();
        (artifact, class)
    }

    fn service() -> (SourceArtifact, ClassDecl) {
        let mut artifact = SourceArtifact::empty("widget_service.rs");
        let class =
            ClassDecl::resolve(&mut artifact, "WidgetService", &ClassScaffold::default()).unwrap();
        (artifact, class)
    }

    #[test]
    fn test_absent_member_is_created_with_marker() {
        let (mut artifact, class) = service();
        let outcome = upsert_member(&mut artifact, &class, &list_member("\"id\"")).unwrap();
        assert_eq!(outcome, MergeOutcome::Created);
        let expected = format!(
            "pub struct WidgetService;\n\nimpl WidgetService {{\n    {MARKER_LINE}\n\
             \x20   pub fn list(&self, page: Page) -> DbResult<Vec<WidgetTable>> {{\n\
             \x20       self.db.select(\"widgets\", &[\"id\"], page)\n    }}\n}}\n"
        );
        assert_eq!(artifact.text(), expected);
    }

    #[test]
    fn test_second_member_follows_the_first() {
        let (mut artifact, class) = service();
        upsert_member(&mut artifact, &class, &list_member("\"id\"")).unwrap();
        let delete = MemberSpec::new("delete")
            .param("id: i64")
            .returns("DbResult<u64>")
            .body("self.db.delete(\"widgets\", \"id\", &id)");
        upsert_member(&mut artifact, &class, &delete).unwrap();

        let text = artifact.text();
        let list_end = text.find("page)\n    }").unwrap();
        let delete_at = text.find("pub fn delete").unwrap();
        assert!(delete_at > list_end);
        assert!(text.contains("    }\n\n    /// @svcgen-managed"));
        assert!(text.ends_with("&id)\n    }\n}\n"));
    }

    #[test]
    fn test_marked_member_is_overwritten_and_stable() {
        let (mut artifact, class) = service();
        upsert_member(&mut artifact, &class, &list_member("\"id\"")).unwrap();

        let with_sku = list_member("\"id\", \"sku\"");
        let outcome = upsert_member(&mut artifact, &class, &with_sku).unwrap();
        assert_eq!(outcome, MergeOutcome::Overwritten);
        assert!(artifact.text().contains("&[\"id\", \"sku\"]"));
        assert_eq!(artifact.text().matches(OWNERSHIP_MARKER).count(), 1);

        let outcome = upsert_member(&mut artifact, &class, &with_sku).unwrap();
        assert_eq!(outcome, MergeOutcome::Unchanged);
    }

    #[test]
    fn test_unmarked_member_is_skipped_untouched() {
        let source = "impl WidgetService {\n    // mine now\n\
                      \x20   pub fn list(&self) -> Vec<u8> { Vec::new() }\n}\n";
        let (mut artifact, class) = load(source);

        let outcome = upsert_member(&mut artifact, &class, &list_member("\"id\"")).unwrap();
        assert_eq!(outcome, MergeOutcome::Skipped);
        assert_eq!(artifact.text(), source);
    }

    #[test]
    fn test_overwrite_keeps_user_attributes_and_normalizes_marker() {
        let source = "impl WidgetService {\n    /// Lists widgets.\n\
                      \x20   ///   @svcgen-managed (old wording)\n    #[allow(clippy::all)]\n\
                      \x20   pub fn list(&self) -> u8 {\n        0\n    }\n\n\
                      \x20   pub fn custom(&self) {}\n}\n";
        let (mut artifact, class) = load(source);

        let outcome = upsert_member(&mut artifact, &class, &list_member("\"id\"")).unwrap();
        assert_eq!(outcome, MergeOutcome::Overwritten);
        let expected = format!(
            "impl WidgetService {{\n    /// Lists widgets.\n    #[allow(clippy::all)]\n\
             \x20   {MARKER_LINE}\n\
             \x20   pub fn list(&self, page: Page) -> DbResult<Vec<WidgetTable>> {{\n\
             \x20       self.db.select(\"widgets\", &[\"id\"], page)\n    }}\n\n\
             \x20   pub fn custom(&self) {{}}\n}}\n"
        );
        assert_eq!(artifact.text(), expected);
    }

    #[test]
    fn test_insert_into_impl_with_only_comments() {
        let (mut artifact, class) = load("impl WidgetService {\n    // helpers go here\n}\n");
        upsert_member(&mut artifact, &class, &list_member("\"id\"")).unwrap();
        let head = "impl WidgetService {\n    // helpers go here\n\n    /// @svcgen-managed";
        assert!(artifact.text().starts_with(head));
        assert!(artifact.syntax().is_ok());
    }

    #[test]
    fn test_user_method_in_second_impl_block_is_skipped() {
        let source = format!(
            "pub struct WidgetService;\n\n\
             impl WidgetService {{\n    {MARKER_LINE}\n\
             \x20   pub fn list(&self) -> u8 {{\n        0\n    }}\n}}\n\n\
             impl WidgetService {{\n\
             \x20   pub fn update(&self, id: i64) -> u8 {{\n        1\n    }}\n}}\n"
        );
        let (mut artifact, class) = load(&source);

        let update = MemberSpec::new("update").param("id: i64").returns("u8").body("2");
        let outcome = upsert_member(&mut artifact, &class, &update).unwrap();
        assert_eq!(outcome, MergeOutcome::Skipped);
        assert_eq!(artifact.text(), source);
        assert_eq!(artifact.text().matches("pub fn update").count(), 1);
    }

    #[test]
    fn test_marked_method_in_second_impl_block_is_overwritten_in_place() {
        let first = "impl WidgetService {\n    pub fn custom(&self) {}\n}\n\n";
        let source = format!(
            "{first}impl WidgetService {{\n    {MARKER_LINE}\n\
             \x20   pub fn list(&self) -> u8 {{\n        0\n    }}\n}}\n"
        );
        let (mut artifact, class) = load(&source);

        let outcome = upsert_member(&mut artifact, &class, &list_member("\"id\"")).unwrap();
        assert_eq!(outcome, MergeOutcome::Overwritten);

        let text = artifact.text();
        assert_eq!(text.matches("pub fn list").count(), 1);
        assert!(text.starts_with(&format!("{first}impl WidgetService {{\n")));
        assert!(text.contains("&[\"id\"], page)"));
        assert!(artifact.syntax().is_ok());
    }

    #[test]
    fn test_missing_impl_is_an_edit_error() {
        let source = "pub struct Other;\n";
        let mut artifact = SourceArtifact::from_existing("w.rs", source.to_string()).unwrap();
        let class = ClassDecl::resolve(&mut artifact, "Other", &ClassScaffold::default()).unwrap();
        artifact.restore(source.to_string());
        let err = upsert_member(&mut artifact, &class, &list_member("\"id\"")).unwrap_err();
        assert!(matches!(err, GenError::Edit { .. }));
    }
}
