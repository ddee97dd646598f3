//! Entity schema discovery.
//!
//! This module provides functionality to:
//! - Scan a schema module for exported `*Table` structs
//! - Convert each one into an [`EntitySchema`] with derived names

mod catalog;
mod types;

pub use catalog::{DEFAULT_TABLE_SUFFIX, SchemaCatalog};
pub use types::{EntitySchema, FieldDef};
