//! Resolution of the service type that managed members live in.

use log::debug;
use syn::{Item, ItemImpl, Type};

use super::SourceArtifact;
use crate::errors::GenResult;

/// Declaration emitted when the service type is missing.
#[derive(Debug, Clone, Default)]
pub struct ClassScaffold {
    /// Struct fields, e.g. `pub db: Db`
    pub fields: Vec<String>,
}

impl ClassScaffold {
    fn render_struct(&self, name: &str) -> String {
        if self.fields.is_empty() {
            return format!("pub struct {name};\n");
        }
        let fields: String = self.fields.iter().map(|f| format!("    {f},\n")).collect();
        format!("pub struct {name} {{\n{fields}}}\n")
    }
}

/// Handle on a service type: a struct plus its inherent `impl` block.
///
/// Only the name is held; the block is looked up again after every edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    name: String,
}

impl ClassDecl {
    /// Find the type in `artifact`, appending the struct and an empty
    /// `impl` block when they are absent.
    pub fn resolve(
        artifact: &mut SourceArtifact,
        name: &str,
        scaffold: &ClassScaffold,
    ) -> GenResult<Self> {
        let class = Self {
            name: name.to_string(),
        };
        let syntax = artifact.syntax()?;

        let has_type = syntax.items.iter().any(|item| declares_type(item, name));
        let has_impl = class.find_impl(&syntax).is_some();

        match (has_type, has_impl) {
            (false, false) => {
                debug!("{}: creating {name}", artifact.path().display());
                let block = format!("{}\nimpl {name} {{}}\n", scaffold.render_struct(name));
                artifact.append_block(&block);
            }
            (true, false) => {
                debug!("{}: adding impl block for {name}", artifact.path().display());
                artifact.append_block(&format!("impl {name} {{}}\n"));
            }
            _ => {}
        }

        Ok(class)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First inherent `impl` block whose self type is this class.
    pub(crate) fn find_impl<'f>(&self, file: &'f syn::File) -> Option<&'f ItemImpl> {
        self.inherent_impls(file).next()
    }

    /// Every inherent `impl` block of this class, in source order.
    pub(crate) fn inherent_impls<'f>(
        &self,
        file: &'f syn::File,
    ) -> impl Iterator<Item = &'f ItemImpl> {
        file.items.iter().filter_map(|item| match item {
            Item::Impl(item_impl)
                if item_impl.trait_.is_none() && self_type_is(&item_impl.self_ty, &self.name) =>
            {
                Some(item_impl)
            }
            _ => None,
        })
    }
}

fn declares_type(item: &Item, name: &str) -> bool {
    match item {
        Item::Struct(s) => s.ident == name,
        Item::Enum(e) => e.ident == name,
        Item::Type(t) => t.ident == name,
        Item::Union(u) => u.ident == name,
        _ => false,
    }
}

fn self_type_is(ty: &Type, name: &str) -> bool {
    match ty {
        Type::Path(type_path) => {
            type_path.path.segments.last().is_some_and(|seg| seg.ident == name)
        }
        _ => false,
    }
}
