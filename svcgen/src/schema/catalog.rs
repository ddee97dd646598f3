//! Schema module scanner that discovers entity tables with `syn`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use proc_macro2::TokenStream;
use quote::ToTokens;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Fields, GenericArgument, LitStr, PathArguments, Type, Visibility};

use super::types::{EntitySchema, FieldDef};
use crate::errors::{GenError, GenResult};
use crate::naming::{pluralize, to_pascal_case, to_snake_case};

/// Default suffix that marks a struct as an entity table.
pub const DEFAULT_TABLE_SUFFIX: &str = "Table";

/// Every entity table declared in one schema module.
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    path: PathBuf,
    entities: Vec<EntitySchema>,
    rejected: Vec<(String, GenError)>,
}

impl SchemaCatalog {
    /// Read and scan the schema module at `path`.
    ///
    /// A module that cannot be read or parsed is a setup failure. A single
    /// malformed table is only recorded in [`SchemaCatalog::rejected`].
    pub fn load(path: &Path, suffix: &str) -> GenResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|err| GenError::io(path, err))?;
        Self::from_source(path, &source, suffix)
    }

    /// Scan schema source text that was already loaded.
    pub fn from_source(path: &Path, source: &str, suffix: &str) -> GenResult<Self> {
        let syntax = syn::parse_file(source).map_err(|err| GenError::parse(path, &err))?;

        let mut by_key: BTreeMap<String, EntitySchema> = BTreeMap::new();
        let mut rejected = Vec::new();

        for item in syntax.items {
            let syn::Item::Struct(item_struct) = item else {
                continue;
            };
            let key = item_struct.ident.to_string();
            if !is_entity_binding(&item_struct, suffix) {
                continue;
            }

            match parse_table(&item_struct, suffix) {
                Ok(Some(schema)) => {
                    debug!("discovered entity {key} -> {}", schema.name);
                    by_key.insert(key, schema);
                }
                Ok(None) => debug!("skipping {key}: marked #[schema(skip)]"),
                Err(err) => rejected.push((key, err)),
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            entities: by_key.into_values().collect(),
            rejected,
        })
    }

    /// Path of the scanned schema module.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entities sorted by key.
    pub fn entities(&self) -> &[EntitySchema] {
        &self.entities
    }

    /// Tables that matched the naming convention but could not be read.
    pub fn rejected(&self) -> &[(String, GenError)] {
        &self.rejected
    }

    pub fn get(&self, key: &str) -> Option<&EntitySchema> {
        self.entities.iter().find(|e| e.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some() || self.rejected.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Exported struct whose name carries the table suffix.
fn is_entity_binding(item: &syn::ItemStruct, suffix: &str) -> bool {
    let name = item.ident.to_string();
    matches!(item.vis, Visibility::Public(_)) && name.len() > suffix.len() && name.ends_with(suffix)
}

#[derive(Default)]
struct TableAttrs {
    group: Option<String>,
    table: Option<String>,
    skip: bool,
}

/// Parse a table struct into an [`EntitySchema`]; `None` when skipped.
fn parse_table(item: &syn::ItemStruct, suffix: &str) -> GenResult<Option<EntitySchema>> {
    let key = item.ident.to_string();
    let schema_error = |message: String| GenError::Schema {
        entity: key.clone(),
        message,
    };

    let attrs = parse_table_attrs(&item.attrs).map_err(|err| schema_error(err.to_string()))?;
    if attrs.skip {
        return Ok(None);
    }

    let Fields::Named(named) = &item.fields else {
        return Err(schema_error("entity tables must use named fields".to_string()));
    };

    let mut fields = Vec::with_capacity(named.named.len());
    for field in &named.named {
        let Some(ident) = &field.ident else { continue };
        let field = parse_field(ident.to_string(), &field.ty, &field.attrs)
            .map_err(|err| schema_error(format!("field `{ident}`: {err}")))?;
        fields.push(field);
    }

    if fields.is_empty() {
        return Err(schema_error("entity table has no fields".to_string()));
    }

    if !fields.iter().any(|f| f.primary_key)
        && let Some(id) = fields.iter_mut().find(|f| f.name == "id")
    {
        id.primary_key = true;
    }

    if fields.iter().filter(|f| f.primary_key).count() > 1 {
        return Err(schema_error("more than one primary key".to_string()));
    }

    let name = to_pascal_case(&key[..key.len() - suffix.len()]);
    let snake = to_snake_case(&name);

    Ok(Some(EntitySchema {
        group: attrs.group.unwrap_or_else(|| snake.clone()),
        table: attrs.table.unwrap_or_else(|| pluralize(&snake)),
        key,
        name,
        fields,
    }))
}

/// Parse struct-level `#[schema(...)]` attributes.
fn parse_table_attrs(attrs: &[Attribute]) -> syn::Result<TableAttrs> {
    let mut parsed = TableAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("schema") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("group") {
                parsed.group = Some(meta.value()?.parse::<LitStr>()?.value());
                return Ok(());
            }
            if meta.path.is_ident("table") {
                parsed.table = Some(meta.value()?.parse::<LitStr>()?.value());
                return Ok(());
            }
            if meta.path.is_ident("skip") {
                parsed.skip = true;
                return Ok(());
            }
            Err(meta.error("unsupported schema attribute"))
        })?;
    }
    Ok(parsed)
}

/// Parse a field definition
fn parse_field(name: String, ty: &Type, attrs: &[Attribute]) -> syn::Result<FieldDef> {
    let (field_type, nullable) = match option_inner(ty) {
        Some(inner) => (type_to_string(inner), true),
        None => (type_to_string(ty), false),
    };

    let mut info = FieldDef::new(name, field_type);
    info.nullable = nullable;

    for attr in attrs {
        if attr.path().is_ident("schema") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    info.primary_key = true;
                    return Ok(());
                }
                if meta.path.is_ident("default") {
                    info.default = Some(meta.value()?.parse::<LitStr>()?.value());
                    return Ok(());
                }
                Err(meta.error("unsupported schema attribute"))
            })?;
        } else if attr.path().is_ident("serde") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    let default = if meta.input.peek(syn::Token![=]) {
                        format!("{}()", meta.value()?.parse::<LitStr>()?.value())
                    } else {
                        "Default::default()".to_string()
                    };
                    info.default.get_or_insert(default);
                    return Ok(());
                }
                skip_meta_value(&meta)
            })?;
        }
    }

    Ok(info)
}

/// Consume the value of a nested meta item we do not interpret.
fn skip_meta_value(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: TokenStream = content.parse()?;
    }
    Ok(())
}

/// Inner type of `Option<T>` (also `std::option::Option<T>`).
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let last = type_path.path.segments.last()?;
    if last.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

/// Convert syn::Type to a string representation
fn type_to_string(ty: &Type) -> String {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => {
            let segments: Vec<String> = type_path
                .path
                .segments
                .iter()
                .map(|seg| {
                    let ident = seg.ident.to_string();
                    match &seg.arguments {
                        PathArguments::AngleBracketed(args) => {
                            let inner: Vec<String> = args
                                .args
                                .iter()
                                .filter_map(|arg| match arg {
                                    GenericArgument::Type(inner_ty) => {
                                        Some(type_to_string(inner_ty))
                                    }
                                    _ => None,
                                })
                                .collect();
                            if inner.is_empty() {
                                ident
                            } else {
                                format!("{}<{}>", ident, inner.join(", "))
                            }
                        }
                        _ => ident,
                    }
                })
                .collect();
            segments.join("::")
        }
        other => other.to_token_stream().to_string(),
    }
}
