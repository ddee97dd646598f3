//! Change detection against the persisted snapshot map.
//!
//! This module provides functionality to:
//! - Canonicalize and hash an entity's schema representation
//! - Load, mutate and atomically rewrite the snapshot file
//! - Decide whether an entity needs regeneration

mod canonical;
mod detector;
mod store;

pub use canonical::{CIRCULAR_PLACEHOLDER, canonical_string, content_hash};
pub use detector::{ChangeCheck, ChangeDetector, ChangeState};
pub use store::{SnapshotEntry, SnapshotStore};
