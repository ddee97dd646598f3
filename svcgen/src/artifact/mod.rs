//! In-memory source artifacts and the structural edits applied to them.
//!
//! This module provides functionality to:
//! - Load target files into a span-aware structural model (or start empty)
//! - Reconcile `use` declarations without duplicating symbols
//! - Upsert methods while respecting the ownership marker
//! - Flush every touched file in one batch

mod class;
mod imports;
mod members;
mod store;
pub(crate) mod text;

use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::errors::{GenError, GenResult};

pub use class::{ClassDecl, ClassScaffold};
pub use imports::{ImportRequirement, ensure_imports};
pub use members::{MemberSpec, MergeOutcome, OWNERSHIP_MARKER, has_ownership_marker, upsert_member};
pub use store::{SaveOutcome, SourceArtifactStore};

const BOM: &str = "\u{feff}";

/// One target file: its current text plus what was on disk when loaded.
///
/// Structural queries re-parse the current text, so every edit is
/// immediately visible to the next one.
#[derive(Debug, Clone)]
pub struct SourceArtifact {
    path: PathBuf,
    text: String,
    on_disk: Option<String>,
}

impl SourceArtifact {
    /// An artifact for a file that does not exist yet.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            text: String::new(),
            on_disk: None,
        }
    }

    /// Wrap existing file contents, rejecting text that does not parse.
    pub fn from_existing(path: impl Into<PathBuf>, text: String) -> GenResult<Self> {
        let path = path.into();
        let text = match text.strip_prefix(BOM) {
            Some(rest) => rest.to_string(),
            None => text,
        };
        syn::parse_file(&text).map_err(|err| GenError::parse(&path, &err))?;
        Ok(Self {
            path,
            on_disk: Some(text.clone()),
            text,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when the file did not exist when the artifact was loaded.
    pub fn is_new(&self) -> bool {
        self.on_disk.is_none()
    }

    /// True when the text differs from what is on disk.
    pub fn is_dirty(&self) -> bool {
        match &self.on_disk {
            Some(on_disk) => *on_disk != self.text,
            None => !self.text.is_empty(),
        }
    }

    /// Parse the current text.
    pub fn syntax(&self) -> GenResult<syn::File> {
        syn::parse_file(&self.text).map_err(|err| GenError::Edit {
            path: self.path.clone(),
            message: format!("edited text no longer parses: {err}"),
        })
    }

    pub(crate) fn splice(&mut self, range: Range<usize>, replacement: &str) {
        self.text.replace_range(range, replacement);
    }

    pub(crate) fn insert(&mut self, at: usize, content: &str) {
        self.text.insert_str(at, content);
    }

    pub(crate) fn append_block(&mut self, block: &str) {
        if !self.text.is_empty() {
            if !self.text.ends_with('\n') {
                self.text.push('\n');
            }
            self.text.push('\n');
        }
        self.text.push_str(block);
        if !block.ends_with('\n') {
            self.text.push('\n');
        }
    }

    /// Current text, to hand back to [`SourceArtifact::restore`].
    pub fn checkpoint(&self) -> String {
        self.text.clone()
    }

    /// Drop every edit made since `checkpoint` was taken.
    pub fn restore(&mut self, checkpoint: String) {
        self.text = checkpoint;
    }

    pub(crate) fn mark_saved(&mut self) {
        self.on_disk = Some(self.text.clone());
    }
}
