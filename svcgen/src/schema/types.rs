//! Schema types for entities discovered in the schema module.

use serde::{Deserialize, Serialize};

/// Complete structural definition of one business entity.
///
/// This is also the representation fed to the change detector, so
/// anything that should not trigger regeneration stays out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Binding name in the schema module (e.g., "WidgetTable")
    pub key: String,

    /// Pascal-cased display name (e.g., "Widget")
    pub name: String,

    /// Target subdirectory for the generated artifact
    pub group: String,

    /// Storage table name (e.g., "widgets")
    pub table: String,

    /// All fields, in declaration order
    pub fields: Vec<FieldDef>,
}

impl EntitySchema {
    /// Field acting as primary key, if any.
    pub fn primary_key(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Information about a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name
    pub name: String,

    /// Rust type as written, without the `Option<...>` wrapper
    #[serde(rename = "type")]
    pub field_type: String,

    /// Whether the field is wrapped in `Option<...>`
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,

    /// Default expression from `#[schema(default = "...")]` or serde
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Whether this field is the primary key
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            nullable: false,
            default: None,
            primary_key: false,
        }
    }

    /// Full Rust type including the `Option` wrapper when nullable.
    pub fn rust_type(&self) -> String {
        if self.nullable {
            format!("Option<{}>", self.field_type)
        } else {
            self.field_type.clone()
        }
    }
}
